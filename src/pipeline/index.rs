use log::debug;
use ndarray::{Array2, Zip};

use crate::{
    components::{band::NamedBand, raster::Raster},
    config::SensorConfig,
    errors::{NdviError, Result},
    pipeline::cloud::QaMask,
    scene::{IndexedScene, MaskedScene, SceneRef},
    source::SceneArchive,
};

/// `(a - b) / (a + b)` per pixel, `NaN` where `valid` is false or `a + b == 0`.
pub fn normalized_difference(
    a: &Raster<u16>,
    b: &Raster<u16>,
    valid: &Array2<bool>,
) -> Result<Raster<f64>> {
    if !a.same_grid(b) || valid.dim() != a.shape() {
        return Err(NdviError::Malformed {
            kind: "raster",
            reason: "normalized difference inputs do not share a grid".into(),
        });
    }
    let data = Zip::from(a.data())
        .and(b.data())
        .and(valid)
        .par_map_collect(|&a, &b, &valid| {
            let (a, b) = (a as f64, b as f64);
            let sum = a + b;
            if valid && sum != 0. {
                (a - b) / sum
            } else {
                f64::NAN
            }
        });
    Ok(Raster::new(data, *a.transform(), a.crs().clone()))
}

/// Index band of a masked scene, the scene's own bands are dropped.
pub fn index_scene(masked: MaskedScene, sensor: &SensorConfig) -> Result<IndexedScene> {
    let scene = masked.scene();
    let ndvi = normalized_difference(
        scene.band(&sensor.nir_band)?,
        scene.band(&sensor.red_band)?,
        masked.valid(),
    )?;
    Ok(IndexedScene::new(
        scene.reference(),
        NamedBand::new(&sensor.index_band, ndvi),
    ))
}

/// Loads, masks and indexes one archived scene per call.
pub fn scene_indexer<'a>(
    archive: &'a dyn SceneArchive,
    sensor: &'a SensorConfig,
) -> Result<impl Fn(&SceneRef) -> Result<IndexedScene> + Sync + 'a> {
    let mask = QaMask::from_sensor(sensor)?;
    let bands = sensor.bands();
    Ok(move |scene: &SceneRef| {
        debug!("indexing scene {}", scene.id);
        let loaded = archive.load(scene, &bands)?;
        index_scene(mask.apply(loaded, &sensor.qa_band)?, sensor)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        components::transforms::GeoTransform,
        crs_geo::Crs,
        scene::Scene,
        sensors::QaBit,
        source::InMemoryArchive,
        test_utils::{date, landsat_scene},
    };
    use geo::coord;
    use itertools::Itertools;
    use ndarray::array;
    use rstest::rstest;

    fn band(data: Array2<u16>) -> Raster<u16> {
        Raster::new(
            data,
            GeoTransform::north_up(coord! { x: 0., y: 2. }, 1., 1.),
            Crs::wgs84(),
        )
    }

    #[rstest]
    fn ndvi_per_pixel() {
        let nir = band(array![[3000, 0], [1000, 500]]);
        let red = band(array![[1000, 0], [3000, 500]]);
        let valid = array![[true, true], [true, false]];
        let ndvi = normalized_difference(&nir, &red, &valid).unwrap();
        assert_eq!(ndvi.get(0, 0), Some(0.5));
        assert!(ndvi.get(0, 1).unwrap().is_nan());
        assert_eq!(ndvi.get(1, 0), Some(-0.5));
        assert!(ndvi.get(1, 1).unwrap().is_nan());
    }

    #[rstest]
    #[case(u16::MAX, 0)]
    #[case(0, u16::MAX)]
    #[case(1, 1)]
    #[case(7, 65000)]
    fn ndvi_stays_within_unit_range(#[case] nir: u16, #[case] red: u16) {
        let ndvi = normalized_difference(
            &band(array![[nir]]),
            &band(array![[red]]),
            &array![[true]],
        )
        .unwrap();
        let value = ndvi.get(0, 0).unwrap();
        assert!((-1. ..=1.).contains(&value));
    }

    #[rstest]
    fn mismatched_inputs_are_rejected() {
        let nir = band(Array2::zeros((2, 2)));
        let red = band(Array2::zeros((2, 3)));
        assert!(normalized_difference(&nir, &red, &Array2::from_elem((2, 2), true)).is_err());
    }

    #[rstest]
    fn index_band_is_named_uniformly() {
        let sensor = SensorConfig::default();
        let scenes = vec![
            landsat_scene("a", date(2018, 7, 1), 3000, 1000, 0),
            landsat_scene("b", date(2018, 8, 1), 2000, 2000, 0),
        ];
        let references = scenes.iter().map(Scene::reference).collect_vec();
        let archive = InMemoryArchive::new(scenes);
        let indexer = scene_indexer(&archive, &sensor).unwrap();
        let indexed = references
            .iter()
            .map(|scene| indexer(scene).unwrap())
            .collect_vec();
        assert!(indexed.iter().all(|scene| scene.index().name() == "NDVI"));
        assert_eq!(indexed[0].reference(), &references[0]);
        assert_eq!(indexed[0].index().raster().mean(), Some(0.5));
        assert_eq!(indexed[1].index().raster().mean(), Some(0.));
    }

    #[rstest]
    fn cloudy_pixels_have_no_index() {
        let sensor = SensorConfig::default();
        let scene = landsat_scene("a", date(2018, 7, 1), 3000, 1000, QaBit::CloudShadow.mask());
        let masked = QaMask::from_sensor(&sensor)
            .unwrap()
            .apply(scene, &sensor.qa_band)
            .unwrap();
        let indexed = index_scene(masked, &sensor).unwrap();
        assert_eq!(indexed.index().raster().valid_count(), 0);
    }
}
