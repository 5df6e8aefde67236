//! Resolution of glTF `uri` strings.
//!
//! A uri is resolved on its own against the document's base path; nothing
//! from one resolution carries over into the next.

use std::path::{Path, PathBuf};

use base64::Engine;

use super::GltfError;

const QRC_PREFIX: &str = "qrc:/";

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedUri {
	/// A path on the local file system.
	File(PathBuf),
	/// A path inside the application's compiled-in resources, as `qrc:/...`.
	Resource(String),
	/// Bytes carried inline by a `data:` uri.
	Data {
		mime_type: Option<String>,
		data: Vec<u8>,
	},
}

fn is_resource(path: &str) -> bool {
	path.starts_with("qrc:") || path.starts_with(":/")
}

fn normalize_resource(path: &str) -> String {
	let rest = path.strip_prefix("qrc:").or_else(|| path.strip_prefix(':')).unwrap_or(path);
	let mut s = String::from(QRC_PREFIX);
	s.push_str(rest.trim_start_matches('/'));
	s
}

/// Whether `uri` starts with a scheme such as `http:`. Single letters are
/// drive letters, not schemes.
fn has_scheme(uri: &str) -> bool {
	match uri.find(':') {
		Some(end) if end > 1 => uri[..end].chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
		_ => false,
	}
}

fn decode_data_uri(uri: &str) -> Result<ResolvedUri, GltfError> {
	let rest = &uri["data:".len()..];
	let (header, payload) = rest.split_once(',').ok_or_else(|| GltfError::InvalidURI(uri.chars().take(64).collect()))?;
	let (mime_type, is_base64) = match header.strip_suffix(";base64") {
		Some(mime) => (mime, true),
		None => (header, false),
	};
	let data = if is_base64 {
		base64::engine::general_purpose::STANDARD.decode(payload)?
	} else {
		percent_encoding::percent_decode_str(payload).collect::<Vec<u8>>()
	};
	Ok(ResolvedUri::Data {
		mime_type: (!mime_type.is_empty()).then(|| mime_type.to_string()),
		data,
	})
}

fn join_base(base_path: &Path, relative: &str) -> ResolvedUri {
	let base = base_path.to_string_lossy();
	if is_resource(&base) {
		let mut s = normalize_resource(&base);
		if !s.ends_with('/') {
			s.push('/');
		}
		s.push_str(relative.trim_start_matches("./"));
		ResolvedUri::Resource(s)
	} else {
		ResolvedUri::File(base_path.join(relative))
	}
}

/// Resolves `uri` relative to `base_path`, which may itself be a resource
/// path such as `:/assets`.
pub fn resolve_uri(uri: &str, base_path: &Path) -> Result<ResolvedUri, GltfError> {
	if uri.starts_with("data:") {
		return decode_data_uri(uri);
	}
	let decoded = percent_encoding::percent_decode_str(uri)
		.decode_utf8()
		.map_err(|_| GltfError::InvalidURI(uri.to_string()))?;
	let decoded: &str = &decoded;
	if decoded.is_empty() {
		return Err(GltfError::InvalidURI(uri.to_string()));
	}

	if is_resource(decoded) {
		Ok(ResolvedUri::Resource(normalize_resource(decoded)))
	} else if let Some(rest) = decoded.strip_prefix("file:") {
		let path = rest.strip_prefix("//").unwrap_or(rest);
		if Path::new(path).is_absolute() {
			Ok(ResolvedUri::File(PathBuf::from(path)))
		} else {
			Ok(join_base(base_path, path))
		}
	} else if Path::new(decoded).is_absolute() || decoded.starts_with('/') {
		Ok(ResolvedUri::File(PathBuf::from(decoded)))
	} else if has_scheme(decoded) {
		Err(GltfError::InvalidURI(uri.to_string()))
	} else {
		Ok(join_base(base_path, decoded))
	}
}
