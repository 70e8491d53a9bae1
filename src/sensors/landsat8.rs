use super::Sensor;

/// Landsat 8 OLI, Collection 2 Tier 1 Level-2 surface reflectance.
#[derive(Debug)]
pub struct Landsat8;

impl Sensor for Landsat8 {
    const COLLECTION: &'static str = "LANDSAT/LC08/C02/T1_L2";
    const QA_BAND: &'static str = "QA_PIXEL";
    const NIR_BAND: &'static str = "SR_B5";
    const RED_BAND: &'static str = "SR_B4";
    const CLOUD_BIT: u8 = QaBit::Cloud as u8;
    const CLOUD_SHADOW_BIT: u8 = QaBit::CloudShadow as u8;
}

/// Bit positions of the `QA_PIXEL` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum QaBit {
    Fill = 0,
    DilatedCloud = 1,
    Cirrus = 2,
    Cloud = 3,
    CloudShadow = 4,
    Snow = 5,
    Clear = 6,
    Water = 7,
}

impl QaBit {
    pub fn mask(self) -> u16 {
        1 << self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn cloud_flags_sit_on_bits_three_and_four() {
        assert_eq!(Landsat8::CLOUD_BIT, 3);
        assert_eq!(Landsat8::CLOUD_SHADOW_BIT, 4);
        assert_eq!(QaBit::Cloud.mask() | QaBit::CloudShadow.mask(), 0b1_1000);
    }
}
