//! Command-line tool to query and set DDC/CI VCP monitor features
//! (spec.md §6, "CLI surface"). An external collaborator by spec.md's own
//! account -- it consumes `ddc-hi`'s facade and never reaches into
//! `ddc-core` directly -- implemented in full because a library with no
//! working CLI is not a believable release.

mod cli;
mod profile;
mod selector;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use std::{fs, process};

use anyhow::{bail, Context as _, Result};
use clap::Parser;
use ddc_hi::{Context, DisplayIdentifier, DisplayReference, ErrorKind, Registry, Settings, VcpValue, VcpValueKind};

use cli::{Cli, Command};
use profile::Profile;

/// Feature codes `getvcp`/`dumpvcp` read when the caller passes the
/// `common` keyword instead of an explicit feature list: brightness,
/// contrast, input source. spec.md §6 only says "feature list or subset
/// keyword" without naming one; this is the workspace's own choice,
/// recorded in DESIGN.md.
const COMMON_FEATURES: &[u8] = &[0x10, 0x12, 0x60];

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => process::exit(0),
        Err(err) => {
            eprintln!("ddcset: {err:#}");
            process::exit(1)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref())?;
    let ctx = build_context(&cli, &settings);
    let verify = resolve_verify(&cli, &settings);

    match &cli.command {
        Command::Detect => cmd_detect(&ctx),
        Command::Capabilities { selector } => cmd_capabilities(&ctx, selector, cli.force),
        Command::Getvcp { selector, features, table } => cmd_getvcp(&ctx, selector, features, *table, cli.force),
        Command::Setvcp { selector, feature, value, table } => {
            cmd_setvcp(&ctx, selector, feature, value, *table, cli.force, verify)
        }
        Command::Dumpvcp { selector, file, features } => cmd_dumpvcp(&ctx, selector, file, features, cli.force),
        Command::Loadvcp { selector, file } => cmd_loadvcp(&ctx, selector, file, cli.force, verify),
        Command::Environment => cmd_environment(&ctx),
    }
}

fn build_context(cli: &Cli, settings: &Settings) -> Context {
    // Built once before any display is opened, since changing the I/O
    // strategy after opens begin is undefined (spec.md §5a).
    Context {
        sleep_table: settings.sleep_table(),
        sleep_stats: Default::default(),
        retry_maxima: settings.retry_maxima(),
        retry_stats: Default::default(),
        io_strategy: if cli.ioctl {
            ddc_core::context::IoStrategy::Ioctl
        } else {
            settings.io_strategy.map(Into::into).unwrap_or_default()
        },
    }
}

fn resolve_verify(cli: &Cli, settings: &Settings) -> bool {
    if cli.verify {
        true
    } else if cli.noverify {
        false
    } else {
        settings.verify_on_set
    }
}

fn config_path(override_path: Option<&std::path::Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return Some(path.to_path_buf());
    }
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("ddcset").join("ddcset.toml"))
}

fn load_settings(override_path: Option<&std::path::Path>) -> Result<Settings> {
    let Some(path) = config_path(override_path) else {
        return Ok(Settings::default());
    };
    match fs::read_to_string(&path) {
        Ok(text) => Settings::from_toml(&text).with_context(|| format!("parsing {}", path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
        Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
    }
}

/// Resolve a display selector to a reference, either from the registry or
/// (under `--force`, for selectors with direct transport coordinates) a
/// freshly synthesized transient one. `storage` hosts the transient
/// reference so its lifetime covers the caller's use of the returned
/// borrow.
fn resolve_reference<'a>(
    identifier: &DisplayIdentifier,
    registry: &'a Registry,
    force: bool,
    storage: &'a mut Option<DisplayReference>,
) -> Result<&'a DisplayReference> {
    if let Some(found) = registry.lookup(identifier) {
        return Ok(found);
    }
    if force {
        let forced = Registry::force_reference(identifier)
            .context("selector has no direct transport coordinates to force a reference from")?;
        *storage = Some(forced);
        return Ok(storage.as_ref().unwrap());
    }
    bail!("no display matched the given selector (pass --force to synthesize one for --bus/--adl/--usb selectors)")
}

fn parse_feature(text: &str) -> Result<u8> {
    let text = text.strip_prefix("0x").unwrap_or(text);
    u8::from_str_radix(text, 16).with_context(|| format!("{text:?} is not a valid hex feature code"))
}

fn parse_feature_list(args: &[String]) -> Result<Vec<u8>> {
    if args.len() == 1 && args[0] == "common" {
        return Ok(COMMON_FEATURES.to_vec());
    }
    args.iter().map(|s| parse_feature(s)).collect()
}

fn cmd_detect(ctx: &Context) -> Result<()> {
    let registry = Registry::detect(ctx);
    let mut found = 0;
    for reference in registry.references() {
        found += 1;
        let working = reference.flags().contains(ddc_hi::ReferenceFlags::DDC_WORKING);
        let identity = reference
            .edid()
            .map(|e| format!("{} 0x{:04x} sn={}", e.manufacturer, e.product_code, e.serial_number))
            .unwrap_or_else(|| "no EDID".to_string());
        println!(
            "Display {}: {:?}  working={}  {}",
            if reference.dispno() > 0 { reference.dispno().to_string() } else { "-".to_string() },
            reference.coordinates(),
            working,
            identity,
        );
    }
    if found == 0 {
        println!("No displays found.");
    }
    Ok(())
}

fn cmd_capabilities(ctx: &Context, selector: &selector::Selector, force: bool) -> Result<()> {
    let identifier = selector.identifier()?;
    let registry = Registry::detect(ctx);
    let mut storage = None;
    let reference = resolve_reference(&identifier, &registry, force, &mut storage)?;
    let mut handle = registry.open(reference, ctx).map_err(to_anyhow)?;
    let caps = handle.get_capabilities(ctx).map_err(to_anyhow)?;
    match std::str::from_utf8(&caps) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{caps:02x?}"),
    }
    Ok(())
}

fn cmd_getvcp(ctx: &Context, selector: &selector::Selector, features: &[String], table: bool, force: bool) -> Result<()> {
    let identifier = selector.identifier()?;
    let features = parse_feature_list(features)?;
    let registry = Registry::detect(ctx);
    let mut storage = None;
    let reference = resolve_reference(&identifier, &registry, force, &mut storage)?;
    let mut handle = registry.open(reference, ctx).map_err(to_anyhow)?;

    let kind = if table { VcpValueKind::Table } else { VcpValueKind::Simple };
    for feature in features {
        match handle.get_value(ctx, feature, kind) {
            Ok(VcpValue::Simple { current, maximum }) => {
                println!("VCP {feature:02x} current={current} maximum={maximum}");
            }
            Ok(VcpValue::Table(bytes)) => {
                println!("VCP {feature:02x} table={bytes:02x?}");
            }
            Err(err) => println!("VCP {feature:02x} error: {}", err.user_message(Some(feature))),
        }
    }
    Ok(())
}

fn cmd_setvcp(
    ctx: &Context,
    selector: &selector::Selector,
    feature: &str,
    value: &str,
    table: bool,
    force: bool,
    verify: bool,
) -> Result<()> {
    let identifier = selector.identifier()?;
    let feature = parse_feature(feature)?;
    let registry = Registry::detect(ctx);
    let mut storage = None;
    let reference = resolve_reference(&identifier, &registry, force, &mut storage)?;
    let mut handle = registry.open(reference, ctx).map_err(to_anyhow)?;

    let vcp_value = if table {
        VcpValue::Table(parse_hex_bytes(value)?)
    } else {
        VcpValue::Simple {
            current: value.parse().with_context(|| format!("{value:?} is not a valid VCP value"))?,
            maximum: 0,
        }
    };

    handle.set_value(ctx, feature, &vcp_value, verify).map_err(to_anyhow)?;
    println!("VCP {feature:02x} set");
    Ok(())
}

fn cmd_dumpvcp(ctx: &Context, selector: &selector::Selector, file: &std::path::Path, features: &[String], force: bool) -> Result<()> {
    let identifier = selector.identifier()?;
    let features = parse_feature_list(features)?;
    let registry = Registry::detect(ctx);
    let mut storage = None;
    let reference = resolve_reference(&identifier, &registry, force, &mut storage)?;
    let edid = reference.edid().cloned();
    let mut handle = registry.open(reference, ctx).map_err(to_anyhow)?;

    let mut profile = Profile {
        edid_hex: edid.as_ref().map(|e| e.raw.iter().map(|b| format!("{b:02x}")).collect()),
        manufacturer: edid.as_ref().map(|e| e.manufacturer.clone()),
        model: edid.as_ref().map(|e| format!("{:04x}", e.product_code)),
        serial: edid.as_ref().map(|e| e.serial_number.to_string()),
        timestamp: Some(SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)),
        values: Vec::new(),
    };

    for feature in features {
        let value = handle.get_value(ctx, feature, VcpValueKind::Simple).map_err(to_anyhow)?;
        profile.values.push((feature, value));
    }

    fs::write(file, profile.to_text()).with_context(|| format!("writing {}", file.display()))?;
    println!("wrote {} VCP values to {}", profile.values.len(), file.display());
    Ok(())
}

fn cmd_loadvcp(ctx: &Context, selector: &selector::Selector, file: &std::path::Path, force: bool, verify: bool) -> Result<()> {
    let identifier = selector.identifier()?;
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let profile = Profile::from_text(&text)?;

    let registry = Registry::detect(ctx);
    let mut storage = None;
    let reference = resolve_reference(&identifier, &registry, force, &mut storage)?;
    let mut handle = registry.open(reference, ctx).map_err(to_anyhow)?;

    for (feature, value) in &profile.values {
        handle.set_value(ctx, *feature, value, verify).map_err(to_anyhow)?;
    }
    println!("loaded {} VCP values from {}", profile.values.len(), file.display());
    Ok(())
}

fn cmd_environment(ctx: &Context) -> Result<()> {
    println!("ddcset {}", env!("CARGO_PKG_VERSION"));
    println!("io_strategy: {:?}", ctx.io_strategy);
    println!(
        "sleep stats: {} calls, {}ms requested, {}ns elapsed",
        ctx.sleep_stats.total_calls(),
        ctx.sleep_stats.total_requested_ms(),
        ctx.sleep_stats.total_elapsed_ns(),
    );
    for class in [
        ddc_core::retry::RetryClass::WriteOnly,
        ddc_core::retry::RetryClass::WriteRead,
        ddc_core::retry::RetryClass::MultiPart,
    ] {
        println!(
            "retry[{class:?}]: successes-by-try={:?} failures={}",
            ctx.retry_stats.successes(class),
            ctx.retry_stats.failures(class),
        );
    }
    Ok(())
}

fn parse_hex_bytes(text: &str) -> Result<Vec<u8>> {
    if text.len() % 2 != 0 {
        bail!("table value must have an even number of hex digits");
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).with_context(|| format!("invalid hex byte at offset {i}")))
        .collect()
}

fn to_anyhow(err: ErrorKind) -> anyhow::Error {
    anyhow::anyhow!("{}", err.user_message(None))
}
