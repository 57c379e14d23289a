use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::GeoDataset;

/// A positive EPSG authority code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EpsgCode(NonZeroU32);

impl EpsgCode {
    pub fn new(code: u32) -> Option<Self> {
        NonZeroU32::new(code).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl FromStr for EpsgCode {
    type Err = Error;

    /// Only plain ASCII digits are accepted: no sign, no whitespace, no prefix.
    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidEpsgCode(s.to_string()));
        }

        s.parse::<u32>()
            .ok()
            .and_then(EpsgCode::new)
            .ok_or_else(|| Error::InvalidEpsgCode(s.to_string()))
    }
}

impl fmt::Display for EpsgCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

/// Coordinate reference system of a dataset.
///
/// Always uses traditional GIS axis order (x = easting / longitude), so
/// coordinates keep their meaning across a transform regardless of the
/// authority's declared axis order.
pub struct Crs {
    srs: SpatialRef,
}

impl Crs {
    pub fn from_epsg(code: EpsgCode) -> Result<Self> {
        let srs = SpatialRef::from_epsg(code.get())?;
        Ok(Self::from_spatial_ref(srs))
    }

    pub fn from_spatial_ref(mut srs: SpatialRef) -> Self {
        srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        Self { srs }
    }

    /// Like `from_spatial_ref`, but first tries to attach an EPSG authority
    /// to definitions (such as ESRI `.prj` files) that lack one.
    pub fn identify(mut srs: SpatialRef) -> Self {
        if let Err(e) = srs.auto_identify_epsg() {
            debug!("Could not identify an EPSG code for the CRS: {}", e);
        }
        Self::from_spatial_ref(srs)
    }

    pub fn spatial_ref(&self) -> &SpatialRef {
        &self.srs
    }

    pub fn epsg(&self) -> Option<EpsgCode> {
        let name = self.srs.auth_name()?;
        if !name.eq_ignore_ascii_case("EPSG") {
            return None;
        }
        let code = self.srs.auth_code().ok()?;
        u32::try_from(code).ok().and_then(EpsgCode::new)
    }

    pub fn to_wkt(&self) -> Result<String> {
        Ok(self.srs.to_wkt()?)
    }

    pub fn to_pretty_wkt(&self) -> Result<String> {
        Ok(self.srs.to_pretty_wkt()?)
    }
}

impl Clone for Crs {
    fn clone(&self) -> Self {
        Self::from_spatial_ref(self.srs.clone())
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.epsg() {
            return write!(f, "{}", code);
        }
        match self.srs.to_wkt() {
            Ok(wkt) => f.write_str(&wkt),
            Err(_) => f.write_str("<unrepresentable CRS>"),
        }
    }
}

impl fmt::Debug for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Crs").field(&self.to_string()).finish()
    }
}

/// Transforms every geometry of `dataset` into `target`.
///
/// Builds a new dataset; `dataset` itself is never touched, so a failure on
/// any single geometry leaves the caller with the original intact.
pub fn reproject(dataset: &GeoDataset, target: EpsgCode) -> Result<GeoDataset> {
    let source = dataset.crs().ok_or(Error::UndefinedCrs)?;
    let target_crs = Crs::from_epsg(target)?;
    let transform = CoordTransform::new(source.spatial_ref(), target_crs.spatial_ref())?;

    let geometries = dataset
        .records()
        .iter()
        .map(|record| {
            record
                .geometry
                .as_ref()
                .map(|geometry| geometry.transform(&transform))
                .transpose()
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    info!(
        "Reprojected {} features from {} to {}",
        dataset.len(),
        source,
        target
    );

    Ok(dataset.with_geometries(geometries, target_crs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnKind, Record, Value};
    use gdal::vector::Geometry;

    #[test]
    fn test_epsg_code_parsing() {
        assert_eq!("4326".parse::<EpsgCode>().unwrap().get(), 4326);
        assert_eq!("3857".parse::<EpsgCode>().unwrap().to_string(), "EPSG:3857");

        for bad in ["", "0", "000", "-4326", "+4326", "43.26", "abc", " 4326", "EPSG:4326", "99999999999"] {
            assert!(
                matches!(bad.parse::<EpsgCode>(), Err(Error::InvalidEpsgCode(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_crs_reports_epsg() {
        let crs = Crs::from_epsg(EpsgCode::new(4326).unwrap()).unwrap();
        assert_eq!(crs.epsg().map(EpsgCode::get), Some(4326));
        assert_eq!(crs.to_string(), "EPSG:4326");
        assert!(crs.clone().to_wkt().unwrap().contains("WGS 84"));
    }

    fn mercator_points() -> GeoDataset {
        let crs = Crs::from_epsg(EpsgCode::new(3857).unwrap()).unwrap();
        let records = vec![
            Record::new(
                Some(Geometry::from_wkt("POINT (111319.490793274 0)").unwrap()),
                vec![Value::Integer(1)],
            ),
            Record::new(None, vec![Value::Integer(2)]),
        ];
        GeoDataset::new(vec![Column::new("id", ColumnKind::Integer)], records, Some(crs)).unwrap()
    }

    #[test]
    fn test_reproject_keeps_lon_lat_order() {
        let dataset = mercator_points();
        let target = EpsgCode::new(4326).unwrap();

        let reprojected = reproject(&dataset, target).unwrap();

        assert_eq!(reprojected.len(), 2);
        assert_eq!(reprojected.crs().and_then(Crs::epsg), Some(target));
        let (x, y, _) = reprojected.geometry(0).unwrap().get_point(0);
        assert!((x - 1.0).abs() < 1e-6, "x = {}", x);
        assert!(y.abs() < 1e-6, "y = {}", y);
        assert!(reprojected.geometry(1).is_none());
        assert_eq!(reprojected.value(1, 0), &Value::Integer(2));

        // source is untouched
        let (x, _, _) = dataset.geometry(0).unwrap().get_point(0);
        assert!((x - 111319.490793274).abs() < 1e-6);
    }

    #[test]
    fn test_crs_without_authority_has_no_epsg() {
        let srs = SpatialRef::from_proj4("+proj=merc +lon_0=10 +datum=WGS84").unwrap();
        let crs = Crs::from_spatial_ref(srs);
        assert_eq!(crs.epsg(), None);
        assert!(crs.to_string().contains("Mercator"));
    }

    #[test]
    fn test_reproject_fails_as_a_whole() {
        let crs = Crs::from_epsg(EpsgCode::new(4326).unwrap()).unwrap();
        let records = vec![
            Record::new(
                Some(Geometry::from_wkt("POINT (0 0)").unwrap()),
                vec![Value::Integer(1)],
            ),
            Record::new(
                Some(Geometry::from_wkt("POINT (0 100)").unwrap()),
                vec![Value::Integer(2)],
            ),
        ];
        let dataset =
            GeoDataset::new(vec![Column::new("id", ColumnKind::Integer)], records, Some(crs)).unwrap();

        assert!(reproject(&dataset, EpsgCode::new(3857).unwrap()).is_err());
        assert_eq!(dataset.crs().and_then(Crs::epsg).map(EpsgCode::get), Some(4326));
        assert_eq!(dataset.geometry(1).unwrap().get_point(0), (0.0, 100.0, 0.0));
    }

    #[test]
    fn test_reproject_to_unknown_code_fails() {
        let dataset = mercator_points();
        let err = reproject(&dataset, EpsgCode::new(999_999).unwrap()).unwrap_err();
        assert!(matches!(err, Error::Gdal(_)));
    }

    #[test]
    fn test_reproject_requires_source_crs() {
        let records = vec![Record::new(
            Some(Geometry::from_wkt("POINT (1 2)").unwrap()),
            vec![],
        )];
        let dataset = GeoDataset::new(vec![], records, None).unwrap();

        let err = reproject(&dataset, EpsgCode::new(4326).unwrap()).unwrap_err();
        assert!(matches!(err, Error::UndefinedCrs));
    }
}
