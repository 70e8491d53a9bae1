use log::debug;
use ndarray::Zip;

use crate::{
    config::SensorConfig,
    errors::{NdviError, Result},
    scene::{MaskedScene, Scene},
};

/// Quality band flags that invalidate a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QaMask {
    bits: u16,
}

impl QaMask {
    pub fn new(positions: &[u8]) -> Result<Self> {
        let mut bits = 0u16;
        for position in positions {
            if *position >= 16 {
                return Err(NdviError::configuration(format!(
                    "qa bit {position} does not fit a 16 bit quality band"
                )));
            }
            bits |= 1 << position;
        }
        Ok(Self { bits })
    }

    pub fn from_sensor(sensor: &SensorConfig) -> Result<Self> {
        Self::new(&[sensor.cloud_bit, sensor.cloud_shadow_bit])
    }

    pub fn bits(&self) -> u16 {
        self.bits
    }

    pub fn is_clear(&self, qa: u16) -> bool {
        qa & self.bits == 0
    }

    pub fn apply(&self, scene: Scene, qa_band: &str) -> Result<MaskedScene> {
        let valid = Zip::from(scene.band(qa_band)?.data()).par_map_collect(|qa| self.is_clear(*qa));
        let masked = MaskedScene::new(scene, valid)?;
        debug!(
            "{}: {:.1}% clear",
            masked.scene().id(),
            masked.valid_fraction() * 100.
        );
        Ok(masked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sensors::QaBit,
        test_utils::{date, landsat_scene},
    };
    use rstest::rstest;

    #[rstest]
    #[case(0b0000_0000, true)]
    #[case(QaBit::Clear.mask(), true)]
    #[case(QaBit::Water.mask() | QaBit::Cirrus.mask(), true)]
    #[case(QaBit::Cloud.mask(), false)]
    #[case(QaBit::CloudShadow.mask(), false)]
    #[case(QaBit::Cloud.mask() | QaBit::CloudShadow.mask(), false)]
    #[case(u16::MAX, false)]
    fn clear_iff_bits_three_and_four_unset(#[case] qa: u16, #[case] expected: bool) {
        let mask = QaMask::from_sensor(&SensorConfig::default()).unwrap();
        assert_eq!(mask.is_clear(qa), expected);
    }

    #[rstest]
    fn rejects_bits_outside_band() {
        assert!(matches!(
            QaMask::new(&[3, 16]),
            Err(NdviError::Configuration(_))
        ));
    }

    #[rstest]
    fn masks_cloudy_pixels() {
        let mask = QaMask::from_sensor(&SensorConfig::default()).unwrap();
        let clear = landsat_scene("clear", date(2018, 7, 1), 3000, 1000, QaBit::Clear.mask());
        let cloudy = landsat_scene("cloudy", date(2018, 8, 1), 3000, 1000, QaBit::Cloud.mask());
        let clear = mask.apply(clear, "QA_PIXEL").unwrap();
        let cloudy = mask.apply(cloudy, "QA_PIXEL").unwrap();
        assert_eq!(clear.scene().id(), "clear");
        assert_eq!(clear.valid_fraction(), 1.);
        assert_eq!(cloudy.valid_fraction(), 0.);
    }

    #[rstest]
    fn missing_qa_band_is_reported() {
        let scene = landsat_scene("S1", date(2018, 7, 1), 3000, 1000, 0)
            .select(&["SR_B5".to_string()])
            .unwrap();
        let mask = QaMask::from_sensor(&SensorConfig::default()).unwrap();
        assert!(matches!(
            mask.apply(scene, "QA_PIXEL"),
            Err(NdviError::MissingBand { .. })
        ));
    }
}
