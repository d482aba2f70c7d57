//! The `dumpvcp`/`loadvcp` profile text format (spec.md §6, "Persisted
//! state"): "line-oriented text: one header line with EDID hex,
//! manufacturer, model, serial, timestamp; then one `VCP hh value` line per
//! feature; version-tagged." spec.md's Non-goals exclude the file syntax
//! beyond round-trip, so this format is ours to define -- the only
//! requirement enforced here is that `load(dump(pairs)) == pairs`.

use std::fmt::Write as _;

use anyhow::{bail, Context as _, Result};
use ddc_core::vcp::VcpValue;

/// The current format version tag, written on the first line of every
/// dump and checked on load.
const FORMAT_TAG: &str = "ddcset-profile-1";

/// Everything a dump captures: the display's identity (for a human
/// re-matching the file to a monitor later) and the `(feature, value)`
/// pairs a load replays.
#[derive(Clone, Debug, Default)]
pub struct Profile {
    pub edid_hex: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub timestamp: Option<u64>,
    pub values: Vec<(u8, VcpValue)>,
}

impl Profile {
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{FORMAT_TAG}");
        if let Some(edid) = &self.edid_hex {
            let _ = writeln!(out, "EDID {edid}");
        }
        if let Some(mfg) = &self.manufacturer {
            let _ = writeln!(out, "MFG {mfg}");
        }
        if let Some(model) = &self.model {
            let _ = writeln!(out, "MODEL {model}");
        }
        if let Some(sn) = &self.serial {
            let _ = writeln!(out, "SN {sn}");
        }
        if let Some(ts) = self.timestamp {
            let _ = writeln!(out, "TIMESTAMP {ts}");
        }
        for (feature, value) in &self.values {
            match value {
                VcpValue::Simple { current, .. } => {
                    let _ = writeln!(out, "VCP {feature:02x} {current}");
                }
                VcpValue::Table(bytes) => {
                    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                    let _ = writeln!(out, "VCP {feature:02x} TABLE {hex}");
                }
            }
        }
        out
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let tag = lines.next().context("empty profile file")?.trim();
        if tag != FORMAT_TAG {
            bail!("unrecognized profile format tag {tag:?}, expected {FORMAT_TAG:?}");
        }

        let mut profile = Profile::default();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, rest) = line.split_once(' ').unwrap_or((line, ""));
            match key {
                "EDID" => profile.edid_hex = Some(rest.to_string()),
                "MFG" => profile.manufacturer = Some(rest.to_string()),
                "MODEL" => profile.model = Some(rest.to_string()),
                "SN" => profile.serial = Some(rest.to_string()),
                "TIMESTAMP" => {
                    profile.timestamp = Some(rest.parse().context("TIMESTAMP line is not a number")?)
                }
                "VCP" => profile.values.push(parse_vcp_line(rest)?),
                other => bail!("unrecognized profile line key {other:?}"),
            }
        }
        Ok(profile)
    }
}

fn parse_vcp_line(rest: &str) -> Result<(u8, VcpValue)> {
    let mut parts = rest.split_whitespace();
    let feature = parts.next().context("VCP line missing feature code")?;
    let feature = u8::from_str_radix(feature, 16).with_context(|| format!("invalid feature code {feature:?}"))?;

    let next = parts.next().context("VCP line missing value")?;
    if next == "TABLE" {
        let hex = parts.next().context("VCP TABLE line missing data")?;
        if hex.len() % 2 != 0 {
            bail!("VCP {feature:02x} TABLE data has odd hex length");
        }
        let mut bytes = Vec::with_capacity(hex.len() / 2);
        for i in (0..hex.len()).step_by(2) {
            bytes.push(u8::from_str_radix(&hex[i..i + 2], 16).context("invalid TABLE hex byte")?);
        }
        Ok((feature, VcpValue::Table(bytes)))
    } else {
        let current: u16 = next.parse().with_context(|| format!("invalid VCP value {next:?}"))?;
        Ok((feature, VcpValue::Simple { current, maximum: 0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_values_round_trip() {
        let profile = Profile {
            edid_hex: Some("00ff".into()),
            manufacturer: Some("ACM".into()),
            model: Some("04d2".into()),
            serial: Some("1234".into()),
            timestamp: Some(1_700_000_000),
            values: vec![
                (0x10, VcpValue::Simple { current: 50, maximum: 100 }),
                (0x12, VcpValue::Simple { current: 75, maximum: 100 }),
            ],
        };

        let text = profile.to_text();
        let parsed = Profile::from_text(&text).unwrap();
        let original_pairs: Vec<_> = profile
            .values
            .iter()
            .map(|(f, v)| (*f, v.current().unwrap_or(0)))
            .collect();
        let parsed_pairs: Vec<_> = parsed.values.iter().map(|(f, v)| (*f, v.current().unwrap_or(0))).collect();
        assert_eq!(original_pairs, parsed_pairs);
        assert_eq!(parsed.manufacturer.as_deref(), Some("ACM"));
        assert_eq!(parsed.timestamp, Some(1_700_000_000));
    }

    #[test]
    fn table_values_round_trip() {
        let profile = Profile {
            values: vec![(0xe0, VcpValue::Table(vec![0xde, 0xad, 0xbe, 0xef]))],
            ..Default::default()
        };
        let parsed = Profile::from_text(&profile.to_text()).unwrap();
        assert_eq!(parsed.values, vec![(0xe0, VcpValue::Table(vec![0xde, 0xad, 0xbe, 0xef]))]);
    }

    #[test]
    fn rejects_unknown_format_tag() {
        assert!(Profile::from_text("some-other-format\nVCP 10 5\n").is_err());
    }

    #[test]
    fn empty_value_set_round_trips() {
        let profile = Profile::default();
        let parsed = Profile::from_text(&profile.to_text()).unwrap();
        assert!(parsed.values.is_empty());
    }
}
