//! Physical-unit conversion for editable instrument fields.
//!
//! Each unit family converts through a single base unit (volts, hertz,
//! seconds, ohms) so any-to-any conversion is two table lookups. The dB
//! family is log-scaled and therefore partial: converting a non-positive
//! voltage into dBV/dBu/dBm/dBr has no defined result and yields `None`,
//! which the panel renders as a blank field instead of an error.
//!
//! Reference levels follow audio-analyzer convention: 0 dBu = 0.775 V and
//! dBm is power-referenced into a fixed 600 Ω load. dBr is relative to a
//! caller-supplied reference voltage (the generator's configured reference).
//!
//! All conversions round to 6 decimal places; integral results render
//! without a decimal point so "0.001 V" becomes "1 mV", not "1.000000 mV".

/// Reference impedance for dBm conversions, in ohms.
pub const DBM_REF_OHMS: f64 = 600.0;

/// Reference voltage for dBu conversions.
pub const DBU_REF_VOLTS: f64 = 0.775;

/// Voltage units accepted by value+unit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoltageUnit {
    Volt,
    MilliVolt,
    MicroVolt,
    DbV,
    DbU,
    DbM,
    DbR,
}

impl VoltageUnit {
    /// Parse a unit token. Accepts the ASCII micro substitute `uV` and both
    /// micro codepoints (U+00B5, U+03BC) alongside the canonical spellings,
    /// and is case-insensitive for the dB family.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "V" => Some(Self::Volt),
            "mV" => Some(Self::MilliVolt),
            "uV" | "\u{b5}V" | "\u{3bc}V" => Some(Self::MicroVolt),
            t if t.eq_ignore_ascii_case("dBV") => Some(Self::DbV),
            t if t.eq_ignore_ascii_case("dBu") => Some(Self::DbU),
            t if t.eq_ignore_ascii_case("dBm") => Some(Self::DbM),
            t if t.eq_ignore_ascii_case("dBr") => Some(Self::DbR),
            _ => None,
        }
    }

    /// Canonical display spelling.
    pub fn canonical(self) -> &'static str {
        match self {
            Self::Volt => "V",
            Self::MilliVolt => "mV",
            Self::MicroVolt => "\u{b5}V",
            Self::DbV => "dBV",
            Self::DbU => "dBu",
            Self::DbM => "dBm",
            Self::DbR => "dBr",
        }
    }

    /// ASCII spelling used on the wire. The instrument protocol does not
    /// accept the micro sign.
    pub fn wire(self) -> &'static str {
        match self {
            Self::MicroVolt => "uV",
            other => other.canonical(),
        }
    }

    /// Convert a value in this unit to volts. `vref` is the dBr reference.
    pub fn to_volts(self, value: f64, vref: f64) -> f64 {
        match self {
            Self::Volt => value,
            Self::MilliVolt => value * 1e-3,
            Self::MicroVolt => value * 1e-6,
            Self::DbV => 10f64.powf(value / 20.0),
            Self::DbU => DBU_REF_VOLTS * 10f64.powf(value / 20.0),
            Self::DbM => {
                let power_watts = 10f64.powf(value / 10.0) / 1000.0;
                (power_watts * DBM_REF_OHMS).sqrt()
            }
            Self::DbR => vref * 10f64.powf(value / 20.0),
        }
    }

    /// Convert volts into this unit. Log-scaled units are undefined for
    /// non-positive voltages and return `None`.
    pub fn from_volts(self, volts: f64, vref: f64) -> Option<f64> {
        match self {
            Self::Volt => Some(volts),
            Self::MilliVolt => Some(volts / 1e-3),
            Self::MicroVolt => Some(volts / 1e-6),
            Self::DbV => (volts > 0.0).then(|| 20.0 * volts.log10()),
            Self::DbU => (volts > 0.0).then(|| 20.0 * (volts / DBU_REF_VOLTS).log10()),
            Self::DbM => {
                if volts <= 0.0 {
                    return None;
                }
                let power_watts = volts * volts / DBM_REF_OHMS;
                Some(10.0 * (power_watts * 1000.0).log10())
            }
            Self::DbR => {
                (volts > 0.0 && vref > 0.0).then(|| 20.0 * (volts / vref).log10())
            }
        }
    }
}

/// Frequency units accepted by value+unit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyUnit {
    Hertz,
    KiloHertz,
}

impl FrequencyUnit {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            t if t.eq_ignore_ascii_case("Hz") => Some(Self::Hertz),
            t if t.eq_ignore_ascii_case("kHz") => Some(Self::KiloHertz),
            _ => None,
        }
    }

    pub fn canonical(self) -> &'static str {
        match self {
            Self::Hertz => "Hz",
            Self::KiloHertz => "kHz",
        }
    }

    pub fn to_hertz(self, value: f64) -> f64 {
        match self {
            Self::Hertz => value,
            Self::KiloHertz => value * 1e3,
        }
    }

    pub fn from_hertz(self, hertz: f64) -> f64 {
        match self {
            Self::Hertz => hertz,
            Self::KiloHertz => hertz / 1e3,
        }
    }
}

/// Time units accepted by value+unit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second,
    MilliSecond,
    MicroSecond,
    Minute,
}

impl TimeUnit {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "s" | "S" => Some(Self::Second),
            t if t.eq_ignore_ascii_case("ms") => Some(Self::MilliSecond),
            "us" | "\u{b5}s" | "\u{3bc}s" | "US" => Some(Self::MicroSecond),
            t if t.eq_ignore_ascii_case("min") => Some(Self::Minute),
            _ => None,
        }
    }

    pub fn canonical(self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::MilliSecond => "ms",
            Self::MicroSecond => "\u{b5}s",
            Self::Minute => "min",
        }
    }

    /// ASCII spelling used on the wire.
    pub fn wire(self) -> &'static str {
        match self {
            Self::MicroSecond => "us",
            other => other.canonical(),
        }
    }

    pub fn to_seconds(self, value: f64) -> f64 {
        match self {
            Self::Second => value,
            Self::MilliSecond => value * 1e-3,
            Self::MicroSecond => value * 1e-6,
            Self::Minute => value * 60.0,
        }
    }

    pub fn from_seconds(self, seconds: f64) -> f64 {
        match self {
            Self::Second => seconds,
            Self::MilliSecond => seconds / 1e-3,
            Self::MicroSecond => seconds / 1e-6,
            Self::Minute => seconds / 60.0,
        }
    }
}

/// Impedance units. The wire protocol wants the words, not the symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpedanceUnit {
    Ohm,
    KiloOhm,
}

impl ImpedanceUnit {
    pub fn parse(token: &str) -> Option<Self> {
        let t = token.trim();
        if t == "\u{3a9}" || t.eq_ignore_ascii_case("ohm") {
            Some(Self::Ohm)
        } else if t == "k\u{3a9}" || t == "K\u{3a9}" || t.eq_ignore_ascii_case("kohm") {
            Some(Self::KiloOhm)
        } else {
            None
        }
    }

    pub fn canonical(self) -> &'static str {
        match self {
            Self::Ohm => "ohm",
            Self::KiloOhm => "kohm",
        }
    }

    pub fn to_ohms(self, value: f64) -> f64 {
        match self {
            Self::Ohm => value,
            Self::KiloOhm => value * 1e3,
        }
    }

    pub fn from_ohms(self, ohms: f64) -> f64 {
        match self {
            Self::Ohm => ohms,
            Self::KiloOhm => ohms / 1e3,
        }
    }
}

/// Convert a distortion/tolerance percentage to dB.
/// Undefined at or below -100 % (the argument of the log becomes
/// non-positive) and returns `None` there.
pub fn percent_to_db(pct: f64) -> Option<f64> {
    (pct > -100.0).then(|| 20.0 * (1.0 + pct / 100.0).log10())
}

/// Inverse of [`percent_to_db`]. Total, not partial: every dB value maps
/// to a percentage above -100.
pub fn db_to_percent(db: f64) -> f64 {
    (10f64.powf(db / 20.0) - 1.0) * 100.0
}

/// Round to 6 decimal places, the precision carried by every numeric field
/// and by trace export.
pub fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

/// Render a converted value: 6 decimals, trailing zeros stripped, integral
/// values without a decimal point.
pub fn format_value(x: f64) -> String {
    let rounded = round6(x);
    let text = format!("{rounded:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Convert the numeric text of a voltage field between units.
///
/// Non-numeric input is returned unchanged (the user may be mid-edit;
/// clobbering their text would be worse than skipping the conversion).
/// An undefined conversion yields an empty string.
pub fn convert_voltage_text(text: &str, from: VoltageUnit, to: VoltageUnit, vref: f64) -> String {
    let Ok(value) = text.trim().parse::<f64>() else {
        return text.to_string();
    };
    match to.from_volts(from.to_volts(value, vref), vref) {
        Some(converted) => format_value(converted),
        None => String::new(),
    }
}

/// Convert the numeric text of a frequency field between units.
pub fn convert_frequency_text(text: &str, from: FrequencyUnit, to: FrequencyUnit) -> String {
    let Ok(value) = text.trim().parse::<f64>() else {
        return text.to_string();
    };
    format_value(to.from_hertz(from.to_hertz(value)))
}

/// Convert the numeric text of a time field between units.
pub fn convert_time_text(text: &str, from: TimeUnit, to: TimeUnit) -> String {
    let Ok(value) = text.trim().parse::<f64>() else {
        return text.to_string();
    };
    format_value(to.from_seconds(from.to_seconds(value)))
}

/// Convert the numeric text of an impedance field between units.
pub fn convert_impedance_text(text: &str, from: ImpedanceUnit, to: ImpedanceUnit) -> String {
    let Ok(value) = text.trim().parse::<f64>() else {
        return text.to_string();
    };
    format_value(to.from_ohms(from.to_ohms(value)))
}

/// Convert the numeric text of a ratio field between `%` and `dB`.
pub fn convert_ratio_text(text: &str, from_pct: bool, to_pct: bool) -> String {
    let Ok(value) = text.trim().parse::<f64>() else {
        return text.to_string();
    };
    if from_pct == to_pct {
        return format_value(value);
    }
    if from_pct {
        match percent_to_db(value) {
            Some(db) => format_value(db),
            None => String::new(),
        }
    } else {
        format_value(db_to_percent(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-6;

    #[test]
    fn linear_voltage_round_trip() {
        for unit in [VoltageUnit::Volt, VoltageUnit::MilliVolt, VoltageUnit::MicroVolt] {
            for value in [0.001, 1.0, 775.0, -3.5] {
                let volts = unit.to_volts(value, 1.0);
                let back = unit.from_volts(volts, 1.0).unwrap();
                assert!((back - value).abs() < TOL, "{unit:?} {value}");
            }
        }
    }

    #[test]
    fn log_voltage_round_trip() {
        for unit in [VoltageUnit::DbV, VoltageUnit::DbU, VoltageUnit::DbM] {
            for value in [-20.0, 0.0, 6.0] {
                let volts = unit.to_volts(value, 1.0);
                let back = unit.from_volts(volts, 1.0).unwrap();
                assert!((back - value).abs() < TOL, "{unit:?} {value}");
            }
        }
    }

    #[test]
    fn dbr_uses_reference_voltage() {
        let vref = 0.5;
        let volts = VoltageUnit::DbR.to_volts(6.0, vref);
        assert!((volts - 0.5 * 10f64.powf(0.3)).abs() < TOL);
        let back = VoltageUnit::DbR.from_volts(volts, vref).unwrap();
        assert!((back - 6.0).abs() < TOL);
    }

    #[test]
    fn zero_dbm_is_775_millivolts() {
        // 0 dBm into 600 ohm is the classic 0.7746 V.
        let volts = VoltageUnit::DbM.to_volts(0.0, 1.0);
        assert!((volts - 0.7746).abs() < 1e-4);
        let back = VoltageUnit::DbM.from_volts(0.7746, 1.0).unwrap();
        assert!(back.abs() < 0.01);
    }

    #[test]
    fn negative_voltage_blanks_log_units() {
        assert!(VoltageUnit::DbV.from_volts(0.0, 1.0).is_none());
        assert!(VoltageUnit::DbU.from_volts(-1.0, 1.0).is_none());
        assert!(VoltageUnit::DbM.from_volts(0.0, 1.0).is_none());
        assert!(VoltageUnit::DbR.from_volts(1.0, 0.0).is_none());
    }

    #[test]
    fn percent_db_scenarios() {
        assert!(percent_to_db(-100.0).is_none());
        assert!(percent_to_db(-120.0).is_none());
        let db = percent_to_db(100.0).unwrap();
        assert!((db - 6.0206).abs() < 1e-4);
        let pct = db_to_percent(db);
        assert!((pct - 100.0).abs() < TOL);
    }

    #[test]
    fn time_round_trip() {
        for unit in [
            TimeUnit::Second,
            TimeUnit::MilliSecond,
            TimeUnit::MicroSecond,
            TimeUnit::Minute,
        ] {
            let seconds = unit.to_seconds(2.5);
            let back = unit.from_seconds(seconds);
            assert!((back - 2.5).abs() < TOL, "{unit:?}");
        }
    }

    #[test]
    fn frequency_round_trip() {
        let hz = FrequencyUnit::KiloHertz.to_hertz(12.0);
        assert!((hz - 12_000.0).abs() < TOL);
        assert!((FrequencyUnit::KiloHertz.from_hertz(hz) - 12.0).abs() < TOL);
    }

    #[test]
    fn parses_micro_variants() {
        assert_eq!(VoltageUnit::parse("uV"), Some(VoltageUnit::MicroVolt));
        assert_eq!(VoltageUnit::parse("\u{b5}V"), Some(VoltageUnit::MicroVolt));
        assert_eq!(VoltageUnit::parse("\u{3bc}V"), Some(VoltageUnit::MicroVolt));
        assert_eq!(TimeUnit::parse("\u{3bc}s"), Some(TimeUnit::MicroSecond));
        assert_eq!(ImpedanceUnit::parse("k\u{3a9}"), Some(ImpedanceUnit::KiloOhm));
        assert_eq!(ImpedanceUnit::parse("ohm"), Some(ImpedanceUnit::Ohm));
    }

    #[test]
    fn formatting_drops_trailing_zeros() {
        assert_eq!(format_value(1.0), "1");
        assert_eq!(format_value(0.5), "0.5");
        assert_eq!(format_value(6.0206), "6.0206");
        assert_eq!(format_value(1000.0), "1000");
        assert_eq!(format_value(1.0000004), "1");
    }

    #[test]
    fn garbage_text_is_left_alone() {
        assert_eq!(
            convert_voltage_text("abc", VoltageUnit::Volt, VoltageUnit::MilliVolt, 1.0),
            "abc"
        );
        assert_eq!(
            convert_time_text("", TimeUnit::Second, TimeUnit::MilliSecond),
            ""
        );
    }

    #[test]
    fn voltage_text_conversion() {
        assert_eq!(
            convert_voltage_text("1", VoltageUnit::Volt, VoltageUnit::MilliVolt, 1.0),
            "1000"
        );
        assert_eq!(
            convert_voltage_text("0", VoltageUnit::DbV, VoltageUnit::Volt, 1.0),
            "1"
        );
        // -120 dBV is a positive (if tiny) voltage; converting 0 V back is blank.
        assert_eq!(
            convert_voltage_text("0", VoltageUnit::Volt, VoltageUnit::DbV, 1.0),
            ""
        );
    }

    #[test]
    fn ratio_text_conversion() {
        assert_eq!(convert_ratio_text("-100", true, false), "");
        let db = convert_ratio_text("100", true, false);
        assert!(db.starts_with("6.02"));
    }
}
