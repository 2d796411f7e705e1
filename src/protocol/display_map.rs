//! Bidirectional code/display maps for enumerated setting families.
//!
//! The settings document and the wire protocol both speak in terse
//! enumeration codes ("RMSS", "B22", "AFASt"); the panel shows human
//! labels ("RMS Selective", "22 kHz", "Auto Fast"). Each family pairs the
//! two, forward lookup for rendering and reverse lookup when translating
//! an edit back to wire form.
//!
//! Within one family no two codes may share a display string, otherwise
//! the reverse lookup silently picks the wrong code. That bijection is
//! enforced by a test over every family rather than trusted.

/// A static bidirectional code ↔ display table.
pub struct DisplayMap {
    pairs: &'static [(&'static str, &'static str)],
}

impl DisplayMap {
    pub const fn new(pairs: &'static [(&'static str, &'static str)]) -> Self {
        Self { pairs }
    }

    /// Forward lookup: wire code → display string.
    pub fn display(&self, code: &str) -> Option<&'static str> {
        self.pairs
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, d)| *d)
    }

    /// Reverse lookup: display string → wire code.
    pub fn code(&self, display: &str) -> Option<&'static str> {
        self.pairs
            .iter()
            .find(|(_, d)| *d == display)
            .map(|(c, _)| *c)
    }

    /// Forward lookup that falls back to the raw code. Unknown codes are
    /// shown as-is rather than hidden.
    pub fn display_or_raw<'a>(&self, code: &'a str) -> &'a str
    where
        'static: 'a,
    {
        self.display(code).unwrap_or(code)
    }

    /// Reverse lookup that falls back to the raw string. An unmapped edit
    /// is sent verbatim rather than rejected.
    pub fn code_or_raw<'a>(&self, display: &'a str) -> &'a str
    where
        'static: 'a,
    {
        self.code(display).unwrap_or(display)
    }

    /// All display strings, in table order (combo-box population order).
    pub fn displays(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pairs.iter().map(|(_, d)| *d)
    }

    pub fn pairs(&self) -> &'static [(&'static str, &'static str)] {
        self.pairs
    }
}

// --- Generator Config ---

pub static INSTRUMENT_GENERATOR: DisplayMap = DisplayMap::new(&[
    ("ANLG", "Analog"),
    ("DIG", "Digital"),
    ("I2S", "I2S Board"),
    ("IMP", "Digital Impairment"),
    ("U2C", "USI Dual Chan"),
]);

pub static CHANNEL_GENERATOR: DisplayMap = DisplayMap::new(&[
    ("OFF", "Off"),
    ("CH1", "1"),
    ("CH2", "2"),
    ("CH2Is1", "2 = 1"),
]);

pub static OUTPUT_TYPE: DisplayMap = DisplayMap::new(&[("UNB", "Unbal"), ("BAL", "Bal")]);

pub static IMPEDANCE_BAL: DisplayMap = DisplayMap::new(&[
    ("R10", "10 \u{3a9}"),
    ("R200", "200 \u{3a9}"),
    ("R600", "600 \u{3a9}"),
]);

pub static IMPEDANCE_UNBAL: DisplayMap = DisplayMap::new(&[("R5", "5 \u{3a9}")]);

pub static COMMON: DisplayMap = DisplayMap::new(&[("FLO", "Float"), ("GRO", "Ground")]);

pub static BANDWIDTH_GENERATOR: DisplayMap = DisplayMap::new(&[
    ("B22", "22 kHz"),
    ("B40", "40 kHz"),
    ("B80", "80 kHz"),
    ("AUTO", "Play Auto"),
    ("SIN185", "Sine 185 kHz"),
]);

pub static VOLT_RANGE: DisplayMap = DisplayMap::new(&[("AUTO", "Auto"), ("FIX", "Fix")]);

// --- Generator Function ---

pub static FUNCTION_GENERATOR: DisplayMap = DisplayMap::new(&[
    ("SIN", "Sine"),
    ("STER", "Stereo Sine"),
    ("MULTI", "Multisine"),
    ("BURST", "Sine Burst"),
    ("S2P", "Sine\u{b2} Pulse"),
    ("MDIS", "Mod Dist"),
    ("DFD", "DFD"),
    ("DIM", "DIM"),
    ("RAND", "Random"),
    ("ARB", "Arbitrary"),
    ("PLAY", "Play"),
    ("PLYA", "Play+Anlr"),
    ("POL", "Polarity"),
    ("MOD", "Modulation"),
    ("DC", "DC"),
    ("SQU", "Square"),
    ("CHIR", "Chirp"),
]);

pub static LOW_DIST: DisplayMap = DisplayMap::new(&[("OFF", "Off"), ("ON", "On")]);

pub static SWEEP_CTRL: DisplayMap = DisplayMap::new(&[
    ("OFF", "Off"),
    ("ASW", "Auto Sweep"),
    ("ALIS", "Auto List"),
]);

pub static NEXT_STEP: DisplayMap = DisplayMap::new(&[
    ("ASYN", "Anlr Sync"),
    ("LIST", "Dwell File"),
    ("DWELl", "Dwell Value"),
]);

pub static X_AXIS: DisplayMap = DisplayMap::new(&[("VOLT", "Voltage"), ("FREQ", "Frequency")]);

pub static Z_AXIS: DisplayMap = DisplayMap::new(&[
    ("OFF", "Off"),
    ("VOLT", "Voltage"),
    ("FREQ", "Frequency"),
]);

pub static SPACING: DisplayMap = DisplayMap::new(&[
    ("LINP", "Lin Points"),
    ("LINS", "Lin Steps"),
    ("LOGP", "Log Points"),
    ("LOGS", "Log Steps"),
]);

/// Weighting/user filter bank. The same table backs the generator filter,
/// the analyzer pre-filter and the three analyzer function filters.
pub static FILTER: DisplayMap = DisplayMap::new(&[
    ("OFF", "Off"),
    ("UFIL1", "Filter 1"),
    ("UFIL2", "Filter 2"),
    ("UFIL3", "Filter 3"),
    ("UFIL4", "Filter 4"),
    ("UFIL5", "Filter 5"),
    ("UFIL6", "Filter 6"),
    ("UFIL7", "Filter 7"),
    ("UFIL8", "Filter 8"),
    ("UFIL9", "Filter 9"),
    ("AWE", "A Weighting"),
    ("CARM", "CCIR 2k wtd"),
    ("CCIU", "CCIR unwtd"),
    ("CCIR", "CCIR 1k wtd"),
    ("CCIT", "CCITT"),
    ("CMES", "C Message"),
    ("DEMP17", "Deemph J.17"),
    ("DCN", "DC Noise HP"),
    ("DEMP5015", "Deemph 50/15"),
    ("DEMP75", "Deemph 75"),
    ("IECT", "IEC Tuner"),
    ("JITT", "Jitter wtd"),
    ("PEMP17", "Preemp J.17"),
    ("PEMP50", "Preemp 50"),
    ("PEMP5015", "Preemp 50/15"),
    ("PEMP75", "Preemp 75"),
    ("HP22", "High-pass 22 Hz"),
    ("HP400", "High-pass 400 Hz"),
    ("LP22", "Low-pass 22 kHz"),
    ("LP30", "Low-pass 30 kHz"),
    ("LP80", "Low-pass 80 kHz"),
    ("AES17", "AES 17"),
    ("CWE", "C Weighting"),
    ("URUM", "Rumble unwtd"),
    ("WRUM", "Rumble wtd"),
]);

pub static HALT: DisplayMap = DisplayMap::new(&[
    ("STARt", "Start"),
    ("VALue", "Value"),
    ("MUTE", "Mute"),
]);

// --- Analyzer Config ---

pub static INSTRUMENT_ANALYZER: DisplayMap = DisplayMap::new(&[
    ("ANLG", "Analog"),
    ("A8CH", "Analog 8 Chan"),
    ("A16CH", "Analog 16 Chan"),
    ("DIG", "Digital"),
    ("I2S", "I2S Board"),
    ("U2CH", "USI Dual Chan"),
    ("U8CH", "USI 8 Chan"),
    ("DIGB", "Dig Bitstream"),
]);

pub static CHANNEL_ANALYZER: DisplayMap = DisplayMap::new(&[
    ("CH1", "1"),
    ("CH2", "2"),
    ("CH1And2", "1 & 2"),
    ("CH1Is2", "1 = 2"),
    ("CH2Is1", "2 = 1"),
]);

pub static CH1_COUPLING: DisplayMap = DisplayMap::new(&[("AC", "AC"), ("DC", "DC")]);

pub static BANDWIDTH_ANALYZER: DisplayMap = DisplayMap::new(&[
    ("B22", "22 kHz"),
    ("B40", "40 kHz"),
    ("B80", "80 kHz"),
    ("B250", "250 kHz"),
]);

pub static CH1_INPUT: DisplayMap = DisplayMap::new(&[
    ("BAL", "Bal"),
    ("GEN1", "GEN CH1"),
    ("GEN2", "GEN CH2"),
]);

pub static CH1_IMPEDANCE: DisplayMap = DisplayMap::new(&[
    ("R300", "300 \u{3a9}"),
    ("R600", "600 \u{3a9}"),
    ("R200K", "200 K\u{3a9}"),
]);

pub static CH1_COMMON: DisplayMap = DisplayMap::new(&[("FLO", "Float"), ("GRO", "Ground")]);

pub static CH1_RANGE: DisplayMap = DisplayMap::new(&[
    ("AUTO", "Auto"),
    ("FIXed", "Fixed"),
    ("LOWer", "Lower"),
]);

pub static START_COND: DisplayMap = DisplayMap::new(&[
    ("AUTO", "Auto"),
    ("TIM", "Time Tick"),
    ("TCH", "Time Chart"),
    ("CH1F", "Freq Ch1"),
    ("CH1R", "Freq Fast Ch1"),
    ("CH1L", "Volt Ch1"),
    ("CH1T", "Lev Trig Ch1"),
    ("CH1E", "Edge Trig Ch1"),
]);

pub static MAX_FFT_SIZE: DisplayMap = DisplayMap::new(&[
    ("S512", "0.5 k"),
    ("S1K", "1 k"),
    ("S2K", "2 k"),
    ("S4K", "4 k"),
    ("S8K", "8 k"),
    ("S16K", "16 k"),
    ("S32K", "32 k"),
    ("S64K", "64 k"),
    ("S128K", "128 k"),
    ("S256K", "256 k"),
]);

// --- Analyzer Function ---

pub static FUNCTION_ANALYZER: DisplayMap = DisplayMap::new(&[
    ("OFF", "Off"),
    ("RMS", "RMS"),
    ("RMSS", "RMS Selective"),
    ("PEAK", "Peak"),
    ("QPE", "Quasi Peak"),
    ("SN", "S/N"),
    ("DC", "DC"),
    ("FFT", "FFT"),
    ("THD", "THD"),
    ("THDN", "THD+N SINAD"),
    ("MDIS", "Mod DIst"),
    ("DFD", "DFD"),
    ("DIM", "DIM"),
    ("POL", "Polarity"),
    ("RUBB", "RUB Buzz"),
    ("REC", "Record"),
    ("NOCT", "1/n Octave"),
    ("PESQ", "PESQ"),
    ("PLUG", "PLUGin"),
    ("PEAQ", "PEAQ"),
    ("COH", "Transfer Co"),
    ("POLQ", "POLQA"),
    ("CHIR", "Chirpbased Meas"),
]);

pub static MEAS_TIME: DisplayMap = DisplayMap::new(&[
    ("AFASt", "Auto Fast"),
    ("AUTO", "Auto"),
    ("VALue", "Value"),
    ("GENT", "Gen Track"),
]);

pub static NOTCH: DisplayMap = DisplayMap::new(&[
    ("OFF", "Off"),
    ("DB0", "0 dB"),
    ("DB12", "12 dB Auto"),
    ("DB30", "30 dB Auto"),
]);

pub static FNCT_SETTLING: DisplayMap = DisplayMap::new(&[
    ("OFF", "Off"),
    ("EXP", "Exponential"),
    ("FLAT", "Flat"),
    ("AVER", "Average"),
]);

pub static LEVEL_MONITOR: DisplayMap = DisplayMap::new(&[
    ("OFF", "Off"),
    ("LRMS", "RMS"),
    ("DC", "DC"),
    ("PEAK", "Peak"),
]);

pub static SECOND_MONITOR: DisplayMap = DisplayMap::new(&[
    ("OFF", "Off"),
    ("INP", "Input Monitor"),
    ("LEV", "Level Monitor"),
]);

pub static INPUT_MONITOR: DisplayMap = DisplayMap::new(&[("OFF", "Off"), ("PEAK", "Peak")]);

pub static FREQ_PHASE: DisplayMap = DisplayMap::new(&[("OFF", "Off"), ("FREQ", "Frequency")]);

pub static BANDWIDTH_ANALYZER_CONFIG: DisplayMap = DisplayMap::new(&[
    ("PPCT1", "BP 1 %"),
    ("PPCT3", "BP 3 %"),
    ("POCT12", "BP 1/12 Oct"),
    ("PTOC", "BP 1/3 Oct"),
    ("PFAS", "BP 1/3 Oct Fast"),
    ("PFIXED", "BP Fixed"),
    ("SPCT1", "BS 1 %"),
    ("SPCT3", "BS 3 %"),
    ("SOCT12", "BS 1/12 Oct"),
    ("STOC", "BS 1/3 Oct"),
    ("SFAS", "BS 1/3 Oct Fast"),
    ("SFIX", "BS Fixed"),
]);

pub static FREQ_MODE: DisplayMap = DisplayMap::new(&[
    ("FIXed", "Fixed"),
    ("GENT", "Gen Track"),
    ("CH1F", "Freq Ch1"),
]);

/// Every enumerated family, for invariant checks and bulk rendering.
pub static ALL_FAMILIES: &[(&str, &DisplayMap)] = &[
    ("Instrument Generator", &INSTRUMENT_GENERATOR),
    ("Channel Generator", &CHANNEL_GENERATOR),
    ("Output Type", &OUTPUT_TYPE),
    ("Impedance (Bal)", &IMPEDANCE_BAL),
    ("Impedance (Unbal)", &IMPEDANCE_UNBAL),
    ("Common", &COMMON),
    ("Bandwidth Generator", &BANDWIDTH_GENERATOR),
    ("Volt Range", &VOLT_RANGE),
    ("Function Generator", &FUNCTION_GENERATOR),
    ("Low Dist", &LOW_DIST),
    ("Sweep Ctrl", &SWEEP_CTRL),
    ("Next Step", &NEXT_STEP),
    ("X Axis", &X_AXIS),
    ("Z Axis", &Z_AXIS),
    ("Spacing", &SPACING),
    ("Filter", &FILTER),
    ("Halt", &HALT),
    ("Instrument Analyzer", &INSTRUMENT_ANALYZER),
    ("Channel Analyzer", &CHANNEL_ANALYZER),
    ("CH1 Coupling", &CH1_COUPLING),
    ("Bandwidth Analyzer", &BANDWIDTH_ANALYZER),
    ("CH1 Input", &CH1_INPUT),
    ("CH1 Impedance", &CH1_IMPEDANCE),
    ("CH1 Common", &CH1_COMMON),
    ("CH1 Range", &CH1_RANGE),
    ("Start Cond", &START_COND),
    ("MAX FFT Size", &MAX_FFT_SIZE),
    ("Function Analyzer", &FUNCTION_ANALYZER),
    ("Meas Time", &MEAS_TIME),
    ("Notch", &NOTCH),
    ("Fnct Settling", &FNCT_SETTLING),
    ("Level Monitor", &LEVEL_MONITOR),
    ("Second Monitor", &SECOND_MONITOR),
    ("Input Monitor", &INPUT_MONITOR),
    ("Freq/Phase", &FREQ_PHASE),
    ("Bandwidth Analyzer Config", &BANDWIDTH_ANALYZER_CONFIG),
    ("Freq Mode", &FREQ_MODE),
];

/// Resolve the display-map family for a settings field, if the field is
/// enumerated at all. Value+unit and ON/OFF fields have no family.
pub fn family_for(section: &str, label: &str) -> Option<&'static DisplayMap> {
    match (section, label) {
        ("Generator Config", "Instrument Generator") => Some(&INSTRUMENT_GENERATOR),
        ("Generator Config", "Channel Generator") => Some(&CHANNEL_GENERATOR),
        ("Generator Config", "Output Type (Unbal/Bal)") => Some(&OUTPUT_TYPE),
        ("Generator Config", "Impedance") => Some(&IMPEDANCE_BAL),
        ("Generator Config", "Common (Float/Ground)") => Some(&COMMON),
        ("Generator Config", "Bandwidth Generator") => Some(&BANDWIDTH_GENERATOR),
        ("Generator Config", "Volt Range (Auto/Fix)") => Some(&VOLT_RANGE),
        ("Generator Function", "Function Generator") => Some(&FUNCTION_GENERATOR),
        ("Generator Function", "Low Dist") => Some(&LOW_DIST),
        ("Generator Function", "Sweep Ctrl") => Some(&SWEEP_CTRL),
        ("Generator Function", "Next Step") => Some(&NEXT_STEP),
        ("Generator Function", "X Axis") => Some(&X_AXIS),
        ("Generator Function", "Z Axis") => Some(&Z_AXIS),
        ("Generator Function", "Spacing") => Some(&SPACING),
        ("Generator Function", "Filter") => Some(&FILTER),
        ("Generator Function", "Halt") => Some(&HALT),
        ("Analyzer Config", "Instrument Analyzer") => Some(&INSTRUMENT_ANALYZER),
        ("Analyzer Config", "Channel Analyzer") => Some(&CHANNEL_ANALYZER),
        ("Analyzer Config", "CH1 Coupling") => Some(&CH1_COUPLING),
        ("Analyzer Config", "Bandwidth Analyzer") => Some(&BANDWIDTH_ANALYZER),
        ("Analyzer Config", "Pre Filter") => Some(&FILTER),
        ("Analyzer Config", "CH1 Input") => Some(&CH1_INPUT),
        ("Analyzer Config", "CH1 Impedance") => Some(&CH1_IMPEDANCE),
        ("Analyzer Config", "CH1 Ground/Common") => Some(&CH1_COMMON),
        ("Analyzer Config", "CH1 Range") => Some(&CH1_RANGE),
        ("Analyzer Config", "Start Cond") => Some(&START_COND),
        ("Analyzer Config", "MAX FFT Size") => Some(&MAX_FFT_SIZE),
        ("Analyzer Function", "Function Analyzer") => Some(&FUNCTION_ANALYZER),
        ("Analyzer Function", "Meas Time") => Some(&MEAS_TIME),
        ("Analyzer Function", "Notch(Gain)") => Some(&NOTCH),
        ("Analyzer Function", "Filter1") => Some(&FILTER),
        ("Analyzer Function", "Filter2") => Some(&FILTER),
        ("Analyzer Function", "Filter3") => Some(&FILTER),
        ("Analyzer Function", "Fnct Settling") => Some(&FNCT_SETTLING),
        ("Analyzer Function", "Level Monitor") => Some(&LEVEL_MONITOR),
        ("Analyzer Function", "Second Monitor") => Some(&SECOND_MONITOR),
        ("Analyzer Function", "Input Monitor") => Some(&INPUT_MONITOR),
        ("Analyzer Function", "Freq/Phase") => Some(&FREQ_PHASE),
        ("Analyzer Function", "Bandwidth Analyzer Config") => Some(&BANDWIDTH_ANALYZER_CONFIG),
        ("Analyzer Function", "Freq Mode") => Some(&FREQ_MODE),
        _ => None,
    }
}

/// Friendly panel label for a field, where the stored JSON key is longer
/// than what the form should show.
pub fn display_label(label: &str) -> &str {
    match label {
        "Bandwidth Analyzer Config" => "Bandwidth",
        "Sweep Ctrl Analyzer Config" => "Sweep Ctrl",
        "Filter1" | "Filter2" | "Filter3" => "Filter",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_family_is_a_bijection() {
        for (name, map) in ALL_FAMILIES {
            let mut codes = HashSet::new();
            let mut displays = HashSet::new();
            for (code, display) in map.pairs() {
                assert!(codes.insert(*code), "duplicate code {code} in {name}");
                assert!(
                    displays.insert(*display),
                    "duplicate display {display:?} in {name}"
                );
            }
            // Reverse of forward must land back on the original code.
            for (code, _) in map.pairs() {
                let display = map.display(code).unwrap();
                assert_eq!(map.code(display), Some(*code), "family {name}");
            }
        }
    }

    #[test]
    fn forward_and_reverse_lookup() {
        assert_eq!(FUNCTION_ANALYZER.display("RMSS"), Some("RMS Selective"));
        assert_eq!(FUNCTION_ANALYZER.code("RMS Selective"), Some("RMSS"));
        assert_eq!(MAX_FFT_SIZE.display("S256K"), Some("256 k"));
        assert_eq!(MAX_FFT_SIZE.code("256 k"), Some("S256K"));
    }

    #[test]
    fn fallback_preserves_unknown_tokens() {
        assert_eq!(FUNCTION_ANALYZER.display_or_raw("XYZZY"), "XYZZY");
        assert_eq!(FUNCTION_ANALYZER.code_or_raw("Not A Mode"), "Not A Mode");
    }

    #[test]
    fn family_registry_covers_enumerated_fields() {
        assert!(family_for("Analyzer Function", "Function Analyzer").is_some());
        assert!(family_for("Analyzer Config", "Pre Filter").is_some());
        // Value+unit fields deliberately have no family.
        assert!(family_for("Generator Config", "Max Voltage").is_none());
        assert!(family_for("Analyzer Function", "Tolerance").is_none());
    }

    #[test]
    fn label_overrides() {
        assert_eq!(display_label("Filter2"), "Filter");
        assert_eq!(display_label("Bandwidth Analyzer Config"), "Bandwidth");
        assert_eq!(display_label("Max Voltage"), "Max Voltage");
    }
}
