//! Processing route URLs and their `files` payload.
//!
//! ```text
//! {cdn}/{route}/{type}?c={name}&files={base64(json([asset, ...]))}&v={version}
//! ```
//!
//! Each payload entry carries `source` and `ext`, plus `attributes` and
//! `dependencies` when non-empty.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::asset::{Asset, AssetType};
use crate::error::{PipelineError, Result};

use super::Container;

/// Encode assets as the `files` query value (before percent-encoding).
pub fn encode_files<'a>(assets: impl IntoIterator<Item = &'a Asset>) -> String {
    let assets: Vec<&Asset> = assets.into_iter().collect();
    // Serializing plain strings and maps cannot fail.
    let json = serde_json::to_vec(&assets).unwrap_or_default();
    STANDARD.encode(json)
}

/// Decode a `files` query value into asset records.
///
/// Spaces are read back as `+`, for clients that sent the base64 text
/// without percent-encoding it.
pub fn decode_files(files: &str) -> Result<Vec<Asset>> {
    let text = files.trim().replace(' ', "+");
    let json = STANDARD
        .decode(text.as_bytes())
        .map_err(|e| PipelineError::Decode(format!("files is not base64: {e}")))?;
    let assets: Vec<Asset> = serde_json::from_slice(&json)
        .map_err(|e| PipelineError::Decode(format!("files is not an asset list: {e}")))?;
    Ok(assets.into_iter().map(Asset::with_derived_ext).collect())
}

impl Container {
    /// Route URL covering `assets`.
    pub(super) fn route_url<'a>(
        &self,
        route: &str,
        kind: AssetType,
        assets: impl IntoIterator<Item = &'a Asset>,
    ) -> String {
        let mut url = format!(
            "{}/{route}/{kind}?c={}&files={}",
            self.options.cdn,
            utf8_percent_encode(&self.name, NON_ALPHANUMERIC),
            utf8_percent_encode(&encode_files(assets), NON_ALPHANUMERIC),
        );
        if let Some(version) = &self.version {
            url.push_str("&v=");
            url.extend(utf8_percent_encode(version, NON_ALPHANUMERIC));
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Attributes;
    use crate::container::tests::options;
    use crate::container::Version;

    #[test]
    fn test_payload_wire_form() {
        let mut asset = Asset::bare("css/theme.less");
        asset.dependencies.push("css/vars.less".into());
        let decoded = decode_files(&encode_files([&asset])).unwrap();
        assert_eq!(decoded, vec![asset]);

        let json = String::from_utf8(STANDARD.decode(encode_files([&Asset::bare("a.js")])).unwrap()).unwrap();
        assert_eq!(json, r#"[{"source":"a.js","ext":"js"}]"#);
    }

    #[test]
    fn test_decode_tolerates_unescaped_plus() {
        let encoded = STANDARD.encode(r#"[{"source":"a>>b.js"}]"#);
        assert!(encoded.contains('+'));
        let decoded = decode_files(&encoded.replace('+', " ")).unwrap();
        assert_eq!(decoded[0].source, "a>>b.js");
        assert_eq!(decoded[0].ext, "js");
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode_files("!!!"), Err(PipelineError::Decode(_))));
        let not_list = STANDARD.encode(r#"{"source":"a.js"}"#);
        assert!(matches!(decode_files(&not_list), Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_route_url() {
        let mut opts = options();
        opts.route = Some("casset".into());
        opts.cdn = "https://cdn.test".into();
        opts.version = Some(Version::Fixed("1.2".into()));
        let c = Container::new("admin panel", opts);

        let asset = Asset::new("js/app.js", Attributes::new(), Vec::new());
        let url = c.route_url("casset", AssetType::Script, [&asset]);
        assert!(url.starts_with("https://cdn.test/casset/script?c=admin%20panel&files="));
        assert!(url.ends_with("&v=1%2E2"));

        let files = url.split("&files=").nth(1).unwrap().split("&v=").next().unwrap();
        let files = percent_encoding::percent_decode_str(files).decode_utf8().unwrap();
        assert_eq!(decode_files(&files).unwrap(), vec![asset]);
    }
}
