//! Turns the `--display`/`--bus`/`--adl`/`--usb`/`--mfg`/`--model`/`--sn`/
//! `--edid` flags (spec.md §6, "Selector syntax") into a
//! [`ddc_hi::DisplayIdentifier`].

use anyhow::{bail, Context as _, Result};
use ddc_hi::DisplayIdentifier;

/// Raw selector flags as clap hands them to us, before validation.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Selector {
    /// Select by the display number the registry assigned during detection.
    #[arg(long)]
    pub display: Option<u32>,
    /// Select by I2C bus number (the `N` in `/dev/i2c-N`).
    #[arg(long)]
    pub bus: Option<u32>,
    /// Select by vendor-adapter `A.D` (adapter index, display-on-adapter index).
    #[arg(long, value_name = "A.D")]
    pub adl: Option<String>,
    /// Select by USB `B.D` (bus, device) address.
    #[arg(long, value_name = "B.D")]
    pub usb: Option<String>,
    /// Select by EDID manufacturer ID, e.g. `ACM`.
    #[arg(long)]
    pub mfg: Option<String>,
    /// Select by EDID product code, as 4 hex digits.
    #[arg(long)]
    pub model: Option<String>,
    /// Select by EDID serial number.
    #[arg(long)]
    pub sn: Option<String>,
    /// Select by the full 128-byte EDID, as 256 hex digits.
    #[arg(long, value_name = "hex128")]
    pub edid: Option<String>,
}

impl Selector {
    /// Translate the flags the user actually passed into one
    /// [`DisplayIdentifier`]. Exactly one selector family must be present;
    /// it is an error to specify none or to mix families (spec.md §6 treats
    /// the forms as mutually exclusive ways of naming one display).
    pub fn identifier(&self) -> Result<DisplayIdentifier> {
        let mut chosen = Vec::new();

        if let Some(n) = self.display {
            chosen.push(DisplayIdentifier::DisplayNumber(n));
        }
        if let Some(bus) = self.bus {
            chosen.push(DisplayIdentifier::I2cBus(bus));
        }
        if let Some(adl) = &self.adl {
            let (adapter, display) = parse_pair(adl, "--adl")?;
            chosen.push(DisplayIdentifier::AdapterIndex { adapter, display });
        }
        if let Some(usb) = &self.usb {
            let (bus, device) = parse_pair(usb, "--usb")?;
            chosen.push(DisplayIdentifier::Usb {
                bus: u8::try_from(bus).context("--usb bus out of range")?,
                device: u8::try_from(device).context("--usb device out of range")?,
            });
        }
        if let Some(hex) = &self.edid {
            chosen.push(DisplayIdentifier::Edid(Box::new(parse_edid_hex(hex)?)));
        }
        if self.mfg.is_some() || self.model.is_some() || self.sn.is_some() {
            chosen.push(DisplayIdentifier::ManufacturerModelSerial {
                manufacturer: self.mfg.clone(),
                model: self.model.clone(),
                serial: self.sn.clone(),
            });
        }

        match chosen.len() {
            0 => bail!("no display selector given (use one of --display/--bus/--adl/--usb/--mfg/--model/--sn/--edid)"),
            1 => Ok(chosen.into_iter().next().unwrap()),
            _ => bail!("multiple display selectors given; pass exactly one"),
        }
    }
}

fn parse_pair(text: &str, flag: &str) -> Result<(u32, u32)> {
    let (a, b) = text
        .split_once('.')
        .with_context(|| format!("{flag} expects the form A.D, got {text:?}"))?;
    let a = a.parse().with_context(|| format!("{flag}: {a:?} is not a number"))?;
    let b = b.parse().with_context(|| format!("{flag}: {b:?} is not a number"))?;
    Ok((a, b))
}

fn parse_edid_hex(hex: &str) -> Result<[u8; 128]> {
    if hex.len() != 256 {
        bail!("--edid expects 256 hex digits (128 bytes), got {} characters", hex.len());
    }
    let mut raw = [0u8; 128];
    for (i, byte) in raw.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .with_context(|| format!("--edid: invalid hex at byte {i}"))?;
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_selector_resolves() {
        let selector = Selector { display: Some(1), ..Default::default() };
        assert_eq!(selector.identifier().unwrap(), DisplayIdentifier::DisplayNumber(1));
    }

    #[test]
    fn no_selector_is_an_error() {
        let selector = Selector::default();
        assert!(selector.identifier().is_err());
    }

    #[test]
    fn conflicting_selectors_are_an_error() {
        let selector = Selector { display: Some(1), bus: Some(2), ..Default::default() };
        assert!(selector.identifier().is_err());
    }

    #[test]
    fn adl_pair_parses() {
        let selector = Selector { adl: Some("1.2".into()), ..Default::default() };
        assert_eq!(
            selector.identifier().unwrap(),
            DisplayIdentifier::AdapterIndex { adapter: 1, display: 2 }
        );
    }

    #[test]
    fn usb_pair_parses() {
        let selector = Selector { usb: Some("3.4".into()), ..Default::default() };
        assert_eq!(selector.identifier().unwrap(), DisplayIdentifier::Usb { bus: 3, device: 4 });
    }

    #[test]
    fn mfg_model_sn_combine_into_one_identifier() {
        let selector = Selector {
            mfg: Some("ACM".into()),
            model: Some("04d2".into()),
            ..Default::default()
        };
        match selector.identifier().unwrap() {
            DisplayIdentifier::ManufacturerModelSerial { manufacturer, model, serial } => {
                assert_eq!(manufacturer.as_deref(), Some("ACM"));
                assert_eq!(model.as_deref(), Some("04d2"));
                assert_eq!(serial, None);
            }
            other => panic!("unexpected identifier: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_edid_length() {
        let selector = Selector { edid: Some("abcd".into()), ..Default::default() };
        assert!(selector.identifier().is_err());
    }
}
