//! Label-to-SCPI command map.
//!
//! Each of the four settings sections maps its field labels onto the SCPI
//! command prefix that configures that field. A write is always
//! `"<prefix> <value>"`. Labels without an entry here are inapplicable to
//! the instrument and get skipped (not failed) during apply.

pub const GENERATOR_CONFIG: &str = "Generator Config";
pub const GENERATOR_FUNCTION: &str = "Generator Function";
pub const ANALYZER_CONFIG: &str = "Analyzer Config";
pub const ANALYZER_FUNCTION: &str = "Analyzer Function";

/// The four fixed sections, in apply order.
pub const SECTIONS: [&str; 4] = [
    GENERATOR_CONFIG,
    GENERATOR_FUNCTION,
    ANALYZER_CONFIG,
    ANALYZER_FUNCTION,
];

/// Top-level document keys that look like raw SCPI but are interpreted by
/// the panel itself and must never be passed through verbatim.
pub const RAW_EXCLUDE: [&str; 3] = ["INIT:CONT", "SweepMode", "ContinuousSweep"];

/// One section's worth of label → command-prefix pairs.
pub struct CommandGroup {
    pub section: &'static str,
    pub commands: &'static [(&'static str, &'static str)],
}

pub static COMMAND_GROUPS: [CommandGroup; 4] = [
    CommandGroup {
        section: GENERATOR_CONFIG,
        commands: &[
            ("Instrument Generator", "INST1"),
            ("Channel Generator", "OUTP:CHAN"),
            ("Output Type (Unbal/Bal)", "OUTP:TYPE"),
            ("Impedance", "OUTP:IMP"),
            ("Common (Float/Ground)", "OUTP:LOW"),
            ("Bandwidth Generator", "OUTP:BAND:MODE"),
            ("Volt Range (Auto/Fix)", "SOUR:VOLT:RANG"),
            ("Max Voltage", "SOUR:VOLT:MAX"),
            ("Ref Voltage", "SOUR:VOLT:REF"),
            ("Ref Frequency", "SOUR:FREQ:REF"),
        ],
    },
    CommandGroup {
        section: GENERATOR_FUNCTION,
        commands: &[
            ("Function Generator", "SOUR:FUNC"),
            ("Low Dist", "SOUR:LOWD"),
            ("Sweep Ctrl", "SOUR:SWE:CONT"),
            ("Frequency", "SOUR:FREQ"),
            ("Next Step", "SOUR:SWE:NEXT"),
            ("X Axis", "SOUR:SWE:XAX"),
            ("Z Axis", "SOUR:SWE:ZAX"),
            ("Spacing", "SOUR:SWE:FREQ:SPAC"),
            ("Start", "SOUR:SWE:FREQ:STAR"),
            ("Stop", "SOUR:SWE:FREQ:STOP"),
            ("Points", "SOUR:SWE:FREQ:POIN"),
            ("Halt", "SOUR:SWE:FREQ:HALT"),
            ("Voltage", "SOUR:VOLT"),
            ("Filter", "SOUR:FILT"),
            ("Equalizer", "SOUR:VOLT:EQU"),
            ("DC Offset", "SOUR:VOLT:OFFS:STAT"),
        ],
    },
    CommandGroup {
        section: ANALYZER_CONFIG,
        commands: &[
            ("Instrument Analyzer", "INST2"),
            ("Channel Analyzer", "INP1:CHAN"),
            ("CH1 Coupling", "INP1:COUP"),
            ("Bandwidth Analyzer", "INP1:BAND:MODE"),
            ("Pre Filter", "INP1:FILT"),
            ("CH1 Input", "INP1:TYPE"),
            ("CH1 Impedance", "INP1:IMP"),
            ("CH1 Ground/Common", "INP1:COMM"),
            ("CH1 Range", "SENS:VOLT:RANG1:MODE"),
            ("Ref Imped", "SENS1:POW:REF:RES"),
            ("Start Cond", "TRIG:SOUR"),
            ("Delay", "TRIG:DEL"),
            ("MAX FFT Size", "SENS1:MAX:FFT:SIZE"),
        ],
    },
    CommandGroup {
        section: ANALYZER_FUNCTION,
        commands: &[
            ("Function Analyzer", "SENS1:FUNC"),
            ("S/N Sequence", "SENS1:FUNC:SNS"),
            ("Meas Time", "SENS1:FUNC:APER:MODE"),
            ("Bandwidth Analyzer Config", "SENS1:BAND:MODE"),
            ("Sweep Ctrl Analyzer Config", "SENS1:SWE:CONT"),
            ("Freq Mode", "SENS1:FREQ:SEL"),
            ("Factor", "SENS1:FREQ:FACT"),
            ("Notch(Gain)", "SENS1:NOTC"),
            ("Filter1", "SENS1:FILT1"),
            ("Filter2", "SENS1:FILT2"),
            ("Filter3", "SENS1:FILT3"),
            ("Fnct Settling", "SENS1:FUNC:SETT:MODE"),
            ("Samples", "SENS1:FUNC:SETT:COUN"),
            ("Tolerance", "SENS1:FUNC:SETT:TOL"),
            ("Resolution", "SENS1:FUNC:SETT:RES"),
            ("Timeout", "SENS1:FUNC:SETT:TOUT"),
            ("Bargraph", "SENS1:FUNC:BARG"),
            ("POST FFT", "SENS1:FUNC:FFT:STAT"),
            ("Level Monitor", "SENSE6:FUNC"),
            ("Second Monitor", "SENSE2:FUNC:SNDM"),
            ("Input Monitor", "SENSE2:FUNCtion"),
            ("Freq/Phase", "SENSE3:FUNCtion"),
            ("Waveform", "SENSE7:FUNCtion"),
        ],
    },
];

/// Resolve a field label to its SCPI command prefix.
pub fn command_prefix(section: &str, label: &str) -> Option<&'static str> {
    COMMAND_GROUPS
        .iter()
        .find(|group| group.section == section)?
        .commands
        .iter()
        .find(|(candidate, _)| *candidate == label)
        .map(|(_, prefix)| *prefix)
}
