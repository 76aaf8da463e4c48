//! Info.plist generation.
//!
//! The manifest is rendered from a handlebars template and then parsed back as
//! a property list to make sure the bundle never ships a malformed manifest.

use crate::bundler::error::{Error, Result};
use crate::bundler::settings::{BundleConfig, BundleMode};
use handlebars::Handlebars;
use serde::Serialize;

const TEMPLATE_NAME: &str = "Info.plist";

/// Keys macOS needs to launch the bundle at all.
const REQUIRED_KEYS: [&str; 3] = ["CFBundleName", "CFBundleExecutable", "CFBundleIdentifier"];

/// Template for `Contents/Info.plist`.
///
/// `CFBundleIconFile` is emitted only with an icon, `LSUIElement` only in tray mode.
pub const INFO_PLIST_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
	<dict>
		<key>CFBundlePackageType</key>
		<string>APPL</string>
		<key>CFBundleInfoDictionaryVersion</key>
		<string>6.0</string>
		<key>CFBundleName</key>
		<string>{{name}}</string>
		<key>CFBundleExecutable</key>
		<string>{{executable}}</string>
		<key>CFBundleIdentifier</key>
		<string>{{identifier}}</string>
		<key>CFBundleVersion</key>
		<string>{{version}}</string>
		<key>CFBundleGetInfoString</key>
		<string>{{info_string}}</string>
		<key>CFBundleShortVersionString</key>
		<string>{{short_version_string}}</string>
{{#if icon_file}}
		<key>CFBundleIconFile</key>
		<string>{{icon_file}}</string>
{{/if}}
		<key>NSHighResolutionCapable</key>
		<true/>
{{#if (eq mode "tray")}}
		<key>LSUIElement</key>
		<true/>
{{/if}}
	</dict>
</plist>
"#;

/// Values substituted into [`INFO_PLIST_TEMPLATE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestData {
    /// `CFBundleName`
    pub name: String,
    /// `CFBundleExecutable`, relative to `Contents`
    pub executable: String,
    /// `CFBundleIdentifier`
    pub identifier: String,
    /// `CFBundleVersion`
    pub version: String,
    /// `CFBundleGetInfoString`
    pub info_string: String,
    /// `CFBundleShortVersionString`
    pub short_version_string: String,
    /// `CFBundleIconFile`, base name of the icon resource
    pub icon_file: Option<String>,
    /// Launch mode; `tray` adds `LSUIElement`
    pub mode: BundleMode,
}

impl ManifestData {
    /// Collects manifest values from the configuration and the assembly outcome.
    pub fn new(config: &BundleConfig, executable: impl Into<String>, icon_file: Option<String>) -> Self {
        Self {
            name: config.name().to_string(),
            executable: executable.into(),
            identifier: config.identifier().to_string(),
            version: config.version().to_string(),
            info_string: config.info_string(),
            short_version_string: config.version().to_string(),
            icon_file,
            mode: config.mode(),
        }
    }
}

/// Renders and validates the manifest text.
///
/// Values are XML-escaped by the template engine, so names containing `&` or
/// `<` still produce a valid property list.
pub fn render_manifest(data: &ManifestData) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_template_string(TEMPLATE_NAME, INFO_PLIST_TEMPLATE)?;
    let rendered = handlebars.render(TEMPLATE_NAME, data)?;

    validate_manifest(&rendered)?;
    Ok(rendered)
}

fn validate_manifest(rendered: &str) -> Result<()> {
    let value = plist::Value::from_reader_xml(std::io::Cursor::new(rendered.as_bytes()))?;
    let dict = value
        .as_dictionary()
        .ok_or_else(|| Error::InvalidManifest("top-level value is not a dictionary".into()))?;

    for key in REQUIRED_KEYS {
        match dict.get(key).and_then(|v| v.as_string()) {
            Some(s) if !s.is_empty() => {}
            _ => return Err(Error::InvalidManifest(format!("missing {key}"))),
        }
    }
    Ok(())
}
