use crate::model::chain::Encoding;

/// Decodes raw bytes per the declared encoding (§3.1, §4.1). Shared by
/// the CSV, XML, and XLSX parsers.
pub fn decode(content: &[u8], encoding: Encoding) -> Result<String, String> {
    match encoding {
        Encoding::Utf8 => String::from_utf8(content.to_vec()).map_err(|err| err.to_string()),
        Encoding::Windows1250 => {
            let (decoded, _, _had_errors) = encoding_rs::WINDOWS_1250.decode(content);
            Ok(decoded.into_owned())
        }
    }
}
