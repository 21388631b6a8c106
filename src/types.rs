//! Core data types for map-warper

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Pixel position inside the uploaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelCoord {
    /// Column, counted from the left edge
    pub x: u32,
    /// Row, counted from the top edge
    pub y: u32,
}

/// Geographic position in decimal degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoord {
    pub lat: f64,
    pub long: f64,
}

impl GeoCoord {
    /// Creates a new geographic coordinate
    pub fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    /// Checks that latitude and longitude are finite and in range
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(Error::InvalidRequest(format!(
                "latitude {} outside [-90, 90]",
                self.lat
            )));
        }
        if !self.long.is_finite() || !(-180.0..=180.0).contains(&self.long) {
            return Err(Error::InvalidRequest(format!(
                "longitude {} outside [-180, 180]",
                self.long
            )));
        }
        Ok(())
    }
}

/// A ground control point: an image pixel tied to a known geographic position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub image: PixelCoord,
    pub geo: GeoCoord,
}

impl ControlPoint {
    /// Creates a control point from pixel and lat/long values
    pub fn new(x: u32, y: u32, lat: f64, long: f64) -> Self {
        Self {
            image: PixelCoord { x, y },
            geo: GeoCoord::new(lat, long),
        }
    }

    /// Positional values for one `-gcp` group.
    ///
    /// gdal_translate expects `<row> <column> <x> <y>` here, so the pixel pair is
    /// emitted y-first and the geographic pair longitude-first.
    pub fn gcp_args(&self) -> [String; 4] {
        [
            self.image.y.to_string(),
            self.image.x.to_string(),
            format!("{:.6}", self.geo.long),
            format!("{:.6}", self.geo.lat),
        ]
    }
}

/// JSON body of `POST /`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub points: Vec<ControlPoint>,
    pub filename: String,
    /// Base64-encoded image bytes
    #[serde(alias = "imageData")]
    pub image_base64: String,
}

/// Extracts the extension of an uploaded file name.
///
/// The extension is the text after the last `.`. It must be non-empty and
/// ASCII alphanumeric because it becomes part of a scratch file name.
pub fn file_extension(filename: &str) -> Result<String> {
    let (_, ext) = filename.rsplit_once('.').ok_or_else(|| {
        Error::InvalidRequest(format!("filename {:?} has no extension", filename))
    })?;

    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidRequest(format!(
            "filename {:?} has an unusable extension",
            filename
        )));
    }

    Ok(ext.to_ascii_lowercase())
}

/// Returns a header-safe stem of the uploaded file name, used to name the download
pub fn download_stem(filename: &str) -> String {
    let base = filename.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(filename);
    let stem = base.rsplit_once('.').map(|(s, _)| s).unwrap_or(base);
    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();

    if cleaned.is_empty() {
        "warped".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcp_args_swap_order() {
        let point = ControlPoint::new(100, 50, 40.001, -73.999);
        assert_eq!(point.gcp_args(), ["50", "100", "-73.999000", "40.001000"]);
    }

    #[test]
    fn test_gcp_args_fixed_precision() {
        let point = ControlPoint::new(0, 0, 40.0, -74.0);
        assert_eq!(point.gcp_args(), ["0", "0", "-74.000000", "40.000000"]);
    }

    #[test]
    fn test_geo_validation() {
        assert!(GeoCoord::new(90.0, 180.0).validate().is_ok());
        assert!(GeoCoord::new(-90.0, -180.0).validate().is_ok());
        assert!(GeoCoord::new(90.5, 0.0).validate().is_err());
        assert!(GeoCoord::new(0.0, -180.1).validate().is_err());
        assert!(GeoCoord::new(f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_negative_pixel_rejected_by_serde() {
        let json = r#"{"image":{"x":-1,"y":0},"geo":{"lat":0.0,"long":0.0}}"#;
        assert!(serde_json::from_str::<ControlPoint>(json).is_err());
    }

    #[test]
    fn test_upload_request_wire_format() {
        let json = r#"{
            "points": [{"image": {"x": 0, "y": 0}, "geo": {"lat": 40.0, "long": -74.0}}],
            "filename": "photo.png",
            "imageBase64": "aGVsbG8="
        }"#;
        let req: UploadRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.points, vec![ControlPoint::new(0, 0, 40.0, -74.0)]);
        assert_eq!(req.filename, "photo.png");
        assert_eq!(req.image_base64, "aGVsbG8=");
    }

    #[test]
    fn test_upload_request_accepts_image_data_alias() {
        let json = r#"{"points": [], "filename": "a.jpg", "imageData": "AA=="}"#;
        let req: UploadRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.image_base64, "AA==");
    }

    #[test]
    fn test_upload_request_missing_field() {
        let json = r#"{"points": [], "imageBase64": "AA=="}"#;
        assert!(serde_json::from_str::<UploadRequest>(json).is_err());
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("photo.png").unwrap(), "png");
        assert_eq!(file_extension("scan.v2.JPG").unwrap(), "jpg");
        assert!(matches!(file_extension("photo"), Err(Error::InvalidRequest(_))));
        assert!(matches!(file_extension("photo."), Err(Error::InvalidRequest(_))));
        assert!(matches!(file_extension("a.b/../c"), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_download_stem() {
        assert_eq!(download_stem("photo.png"), "photo");
        assert_eq!(download_stem("../maps/old map.jpeg"), "oldmap");
        assert_eq!(download_stem("\"\".png"), "warped");
    }
}
