//! Per-model programming limits.
//!
//! The whole Genesys range shares one command set; models differ only in the
//! setpoint windows they accept. The protection windows below are the
//! vendor's tables 7.6 (over-voltage) and 7.7 (under-voltage); the rated
//! output itself is read out of the `IDN?` reply at connect time.

use strum_macros::EnumIter;

/// The voltage class of a supply, i.e. the `GEN<volts>-XY` family it belongs
/// to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum VoltageClass {
    Gen6,
    Gen8,
    Gen12_5,
    Gen20,
    Gen30,
    Gen40,
    Gen60,
    Gen80,
    Gen100,
    Gen150,
    Gen300,
    Gen600,
}

impl VoltageClass {
    /// Rated output voltage in volts, the upper bound for `PV`.
    pub const fn volts(self) -> f32 {
        match self {
            Self::Gen6 => 6.0,
            Self::Gen8 => 8.0,
            Self::Gen12_5 => 12.5,
            Self::Gen20 => 20.0,
            Self::Gen30 => 30.0,
            Self::Gen40 => 40.0,
            Self::Gen60 => 60.0,
            Self::Gen80 => 80.0,
            Self::Gen100 => 100.0,
            Self::Gen150 => 150.0,
            Self::Gen300 => 300.0,
            Self::Gen600 => 600.0,
        }
    }

    /// The window `OVP` accepts, in volts.
    pub const fn ovp_range(self) -> (f32, f32) {
        match self {
            Self::Gen6 => (0.5, 7.5),
            Self::Gen8 => (0.5, 10.0),
            Self::Gen12_5 => (1.0, 15.0),
            Self::Gen20 => (1.0, 24.0),
            Self::Gen30 => (2.0, 36.0),
            Self::Gen40 => (2.0, 44.0),
            Self::Gen60 => (5.0, 66.0),
            Self::Gen80 => (5.0, 88.0),
            Self::Gen100 => (5.0, 110.0),
            Self::Gen150 => (5.0, 165.0),
            Self::Gen300 => (5.0, 330.0),
            Self::Gen600 => (5.0, 660.0),
        }
    }

    /// The highest value `UVL` accepts, in volts; the lower bound is always
    /// zero. Roughly 95 % of the rated voltage.
    pub const fn uvl_max(self) -> f32 {
        match self {
            Self::Gen6 => 5.7,
            Self::Gen8 => 7.6,
            Self::Gen12_5 => 11.9,
            Self::Gen20 => 19.0,
            Self::Gen30 => 28.5,
            Self::Gen40 => 38.0,
            Self::Gen60 => 57.0,
            Self::Gen80 => 76.0,
            Self::Gen100 => 95.0,
            Self::Gen150 => 142.0,
            Self::Gen300 => 285.0,
            Self::Gen600 => 570.0,
        }
    }

    /// The voltage token as it appears inside a model number, e.g. `"12.5"`
    /// in `GEN12.5-60`.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gen6 => "6",
            Self::Gen8 => "8",
            Self::Gen12_5 => "12.5",
            Self::Gen20 => "20",
            Self::Gen30 => "30",
            Self::Gen40 => "40",
            Self::Gen60 => "60",
            Self::Gen80 => "80",
            Self::Gen100 => "100",
            Self::Gen150 => "150",
            Self::Gen300 => "300",
            Self::Gen600 => "600",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label {
            "6" => Some(Self::Gen6),
            "8" => Some(Self::Gen8),
            "12.5" => Some(Self::Gen12_5),
            "20" => Some(Self::Gen20),
            "30" => Some(Self::Gen30),
            "40" => Some(Self::Gen40),
            "60" => Some(Self::Gen60),
            "80" => Some(Self::Gen80),
            "100" => Some(Self::Gen100),
            "150" => Some(Self::Gen150),
            "300" => Some(Self::Gen300),
            "600" => Some(Self::Gen600),
            _ => None,
        }
    }
}

/// Programming limits of one supply, learned from its identity reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratings {
    pub class: VoltageClass,
    /// Rated output current in amps, the upper bound for `PC`.
    pub current_max: f32,
}

impl Ratings {
    /// Parse an identity reply of the form `Lambda, GEN40-38`.
    pub fn from_identity(identity: &str) -> Option<Self> {
        let rating = identity.split("GEN").nth(1)?;
        let (volts, amps) = rating.split_once('-')?;
        let class = VoltageClass::from_label(volts.trim())?;
        let current_max = amps.trim().parse::<f32>().ok()?;
        if current_max <= 0.0 {
            return None;
        }
        Some(Self { class, current_max })
    }

    /// Rated output voltage in volts.
    pub fn voltage_max(&self) -> f32 {
        self.class.volts()
    }

    pub fn ovp_range(&self) -> (f32, f32) {
        self.class.ovp_range()
    }

    pub fn uvl_max(&self) -> f32 {
        self.class.uvl_max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn labels_round_trip() {
        for class in VoltageClass::iter() {
            assert_eq!(VoltageClass::from_label(class.label()), Some(class));
        }
    }

    #[test]
    fn windows_bracket_the_rated_voltage() {
        for class in VoltageClass::iter() {
            let (ovp_min, ovp_max) = class.ovp_range();
            assert!(ovp_min < class.volts());
            assert!(ovp_max > class.volts());
            assert!(class.uvl_max() < class.volts());
        }
    }

    #[test]
    fn identity_parses_model_and_current() {
        let ratings = Ratings::from_identity("Lambda, GEN40-38").unwrap();
        assert_eq!(ratings.class, VoltageClass::Gen40);
        assert_eq!(ratings.voltage_max(), 40.0);
        assert_eq!(ratings.current_max, 38.0);
        assert_eq!(ratings.ovp_range(), (2.0, 44.0));
        assert_eq!(ratings.uvl_max(), 38.0);
    }

    #[test]
    fn identity_accepts_fractional_classes() {
        let ratings = Ratings::from_identity("Lambda, GEN12.5-60").unwrap();
        assert_eq!(ratings.class, VoltageClass::Gen12_5);
        assert_eq!(ratings.current_max, 60.0);
    }

    #[test]
    fn identity_rejects_unknown_models() {
        assert!(Ratings::from_identity("Lambda, GEN55-10").is_none());
        assert!(Ratings::from_identity("Lambda, XP500-10").is_none());
        assert!(Ratings::from_identity("GEN40").is_none());
        assert!(Ratings::from_identity("").is_none());
    }
}
