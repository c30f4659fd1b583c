use std::path::Path;

use serde::{Deserialize, Serialize};

/// Raw pixmap as it appears in the `image-data`/`icon_data` hints: the
/// D-Bus `(iiibiiay)` tuple, with the pixel bytes carried as base64 in the
/// JSON wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, zbus::zvariant::Value, zbus::zvariant::OwnedValue)]
pub struct ImageData {
	pub width: i32,
	pub height: i32,
	pub rowstride: i32,
	pub has_alpha: bool,
	pub bits_per_sample: i32,
	pub channels: i32,
	#[serde(with = "b64")]
	pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
	#[error("bad dimensions {width}x{height}")]
	BadDimensions { width: i32, height: i32 },
	#[error("unsupported format: {bits_per_sample} bits, {channels} channels, alpha {has_alpha}")]
	UnsupportedFormat { bits_per_sample: i32, channels: i32, has_alpha: bool },
	#[error("rowstride {rowstride} too small for {width} pixels of {channels} channels")]
	BadRowstride { rowstride: i32, width: i32, channels: i32 },
	#[error("pixel buffer is {actual} bytes, declared size is {expected}")]
	LengthMismatch { expected: usize, actual: usize },
}

/// A pixmap that passed validation. The only way to get one is [`decode`],
/// so a `Bitmap` can be handed to a renderer without re-checking bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap(ImageData);

impl Bitmap {
	pub fn data(&self) -> &ImageData {
		&self.0
	}

	pub fn into_inner(self) -> ImageData {
		self.0
	}
}

pub fn decode(data: ImageData) -> Result<Bitmap, ImageError> {
	if data.width <= 0 || data.height <= 0 {
		return Err(ImageError::BadDimensions { width: data.width, height: data.height });
	}
	let channels_ok = matches!((data.channels, data.has_alpha), (3, false) | (4, true));
	if data.bits_per_sample != 8 || !channels_ok {
		return Err(ImageError::UnsupportedFormat {
			bits_per_sample: data.bits_per_sample,
			channels: data.channels,
			has_alpha: data.has_alpha,
		});
	}
	if (data.rowstride as i64) < data.width as i64 * data.channels as i64 {
		return Err(ImageError::BadRowstride {
			rowstride: data.rowstride,
			width: data.width,
			channels: data.channels,
		});
	}
	// exact match; a producer that lies about the buffer is rejected, not clamped
	let expected = data.rowstride as usize * data.height as usize;
	if data.data.len() != expected {
		return Err(ImageError::LengthMismatch { expected, actual: data.data.len() });
	}
	Ok(Bitmap(data))
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageRef {
	Bitmap(Bitmap),
	/// Absolute path, verified to exist at resolution time.
	File(String),
	/// Symbolic name, resolved by the presentation layer's icon theme.
	Themed(String),
}

pub fn resolve_icon(name_or_path: &str) -> Option<ImageRef> {
	if name_or_path.is_empty() {
		return None;
	}
	let path = Path::new(name_or_path);
	if path.is_absolute() {
		if path.exists() {
			Some(ImageRef::File(name_or_path.to_owned()))
		} else {
			log::debug!("icon path {} does not exist, ignoring", name_or_path);
			None
		}
	} else {
		Some(ImageRef::Themed(name_or_path.to_owned()))
	}
}

mod b64 {
	use base64::engine::general_purpose::STANDARD;
	use base64::Engine;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(data: &[u8], ser: S) -> Result<S::Ok, S::Error> {
		ser.serialize_str(&STANDARD.encode(data))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
		let text = String::deserialize(de)?;
		STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn pixmap(width: i32, height: i32) -> ImageData {
		ImageData {
			width,
			height,
			rowstride: width * 4,
			has_alpha: true,
			bits_per_sample: 8,
			channels: 4,
			data: vec![0xab; (width * 4 * height) as usize],
		}
	}

	#[test]
	fn decode_accepts_consistent_pixmap() {
		let data = pixmap(4, 3);
		let bitmap = decode(data.clone()).unwrap();
		assert_eq!(bitmap.data(), &data);
	}

	#[test]
	fn decode_rejects_length_mismatch() {
		let mut data = pixmap(4, 3);
		data.data.pop();
		assert_eq!(
			decode(data),
			Err(ImageError::LengthMismatch { expected: 48, actual: 47 })
		);
	}

	#[test]
	fn decode_rejects_bad_dimensions_and_stride() {
		let mut data = pixmap(4, 3);
		data.height = 0;
		assert!(matches!(decode(data), Err(ImageError::BadDimensions { .. })));

		let mut data = pixmap(4, 3);
		data.rowstride = 4;
		data.data = vec![0; 12];
		assert!(matches!(decode(data), Err(ImageError::BadRowstride { .. })));

		let mut data = pixmap(4, 3);
		data.channels = 4;
		data.has_alpha = false;
		assert!(matches!(decode(data), Err(ImageError::UnsupportedFormat { .. })));
	}

	#[test]
	fn serde_round_trip_is_identity() {
		let data = pixmap(2, 2);
		let json = serde_json::to_string(&data).unwrap();
		// pixel bytes travel as base64 text, not a json array
		assert!(json.contains("\"data\":\""));
		let back: ImageData = serde_json::from_str(&json).unwrap();
		assert_eq!(back, data);
	}

	#[test]
	fn resolve_icon_paths_and_names() {
		assert_eq!(
			resolve_icon("dialog-information"),
			Some(ImageRef::Themed("dialog-information".into()))
		);
		assert_eq!(resolve_icon(""), None);
		assert_eq!(resolve_icon("/no/such/icon/anywhere.png"), None);

		let path = std::env::temp_dir().join("tsuuchi-icon-test.png");
		std::fs::write(&path, b"png").unwrap();
		let resolved = resolve_icon(path.to_str().unwrap());
		std::fs::remove_file(&path).unwrap();
		assert_eq!(resolved, Some(ImageRef::File(path.to_str().unwrap().to_owned())));
	}
}
