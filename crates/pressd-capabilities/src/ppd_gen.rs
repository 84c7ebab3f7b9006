// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// IPP-Everywhere PPD generation: a synthetic PPD text
// document assembled from a printer's derived `Capabilities`, for clients
// that still ask CUPS for a driver file rather than querying IPP directly.

use std::fmt::Write as _;

use tracing::instrument;

use crate::capabilities::Capabilities;

/// Render an IPP-Everywhere PPD for `printer_name` from its derived
/// capabilities. The output is the minimal set of PPD keywords a CUPS
/// client needs to drive an IPP Everywhere printer: `*PageSize`,
/// `*InputSlot`, `*Duplex`, `*ColorModel`, `*Resolution`, and
/// `*cupsFilter2` declaring that CUPS should hand the job straight to the
/// IPP backend rather than rasterizing locally.
#[instrument(skip(capabilities), fields(printer = printer_name))]
pub fn generate_ipp_everywhere_ppd(printer_name: &str, capabilities: &Capabilities) -> String {
    let mut ppd = String::new();

    let _ = writeln!(ppd, "*PPD-Adobe: \"4.3\"");
    let _ = writeln!(ppd, "*FormatVersion: \"4.3\"");
    let _ = writeln!(ppd, "*FileVersion: \"1.0\"");
    let _ = writeln!(ppd, "*LanguageEncoding: ISOLatin1");
    let _ = writeln!(ppd, "*LanguageVersion: English");
    let _ = writeln!(ppd, "*Manufacturer: \"IPP Everywhere\"");
    let _ = writeln!(ppd, "*ModelName: \"{printer_name}\"");
    let _ = writeln!(ppd, "*NickName: \"{printer_name}, IPP Everywhere\"");
    let _ = writeln!(ppd, "*PCFileName: \"ippeve.ppd\"");
    let _ = writeln!(ppd, "*Product: \"({printer_name})\"");
    let _ = writeln!(ppd, "*cupsVersion: 2.4");
    let _ = writeln!(ppd, "*cupsSNMPSupplies: False");
    let _ = writeln!(ppd, "*cupsLanguages: \"en\"");
    let _ = writeln!(
        ppd,
        "*cupsFilter2: \"application/vnd.cups-pdf application/pdf 0 -\""
    );
    ppd.push('\n');

    write_page_size(&mut ppd, capabilities);
    write_input_slot(&mut ppd, capabilities);
    write_duplex(&mut ppd, capabilities);
    write_color_model(&mut ppd, capabilities);
    write_resolution(&mut ppd, capabilities);

    ppd
}

fn write_page_size(ppd: &mut String, caps: &Capabilities) {
    let _ = writeln!(ppd, "*OpenUI *PageSize/Media Size: PickOne");
    let _ = writeln!(ppd, "*OrderDependency: 10 AnySetup *PageSize");
    let _ = writeln!(ppd, "*DefaultPageSize: {}", pwg_to_ppd_choice(&caps.media_default));
    for media in &caps.media_supported {
        if media.starts_with("custom_min") || media.starts_with("custom_max") {
            continue;
        }
        let choice = pwg_to_ppd_choice(media);
        let _ = writeln!(ppd, "*PageSize {choice}/{media}: \"\"");
    }
    let _ = writeln!(ppd, "*CloseUI: *PageSize");
}

fn write_input_slot(ppd: &mut String, caps: &Capabilities) {
    if caps.media_sources.is_empty() {
        return;
    }
    let _ = writeln!(ppd, "*OpenUI *InputSlot/Media Source: PickOne");
    let default = caps.media_source_default.as_deref().unwrap_or("Auto");
    let _ = writeln!(ppd, "*DefaultInputSlot: {}", pwg_to_ppd_choice(default));
    for source in &caps.media_sources {
        let choice = pwg_to_ppd_choice(source);
        let _ = writeln!(ppd, "*InputSlot {choice}/{source}: \"\"");
    }
    let _ = writeln!(ppd, "*CloseUI: *InputSlot");
}

fn write_duplex(ppd: &mut String, caps: &Capabilities) {
    let _ = writeln!(ppd, "*OpenUI *Duplex/2-Sided Printing: PickOne");
    let default_choice = match caps.sides_default.as_str() {
        "two-sided-long-edge" => "DuplexNoTumble",
        "two-sided-short-edge" => "DuplexTumble",
        _ => "None",
    };
    let _ = writeln!(ppd, "*DefaultDuplex: {default_choice}");
    let _ = writeln!(ppd, "*Duplex None/Off: \"\"");
    if caps.supports_sides("two-sided-long-edge") {
        let _ = writeln!(ppd, "*Duplex DuplexNoTumble/Long-Edge: \"\"");
    }
    if caps.supports_sides("two-sided-short-edge") {
        let _ = writeln!(ppd, "*Duplex DuplexTumble/Short-Edge: \"\"");
    }
    let _ = writeln!(ppd, "*CloseUI: *Duplex");
}

fn write_color_model(ppd: &mut String, caps: &Capabilities) {
    let _ = writeln!(ppd, "*OpenUI *ColorModel/Color Mode: PickOne");
    let default_choice = ppd_color_choice(&caps.color_mode_default);
    let _ = writeln!(ppd, "*DefaultColorModel: {default_choice}");
    for mode in &caps.color_modes {
        let choice = ppd_color_choice(mode);
        let _ = writeln!(ppd, "*ColorModel {choice}/{mode}: \"\"");
    }
    let _ = writeln!(ppd, "*CloseUI: *ColorModel");
}

fn write_resolution(ppd: &mut String, caps: &Capabilities) {
    if caps.resolutions.is_empty() {
        return;
    }
    let _ = writeln!(ppd, "*OpenUI *Resolution/Resolution: PickOne");
    let (dx, dy) = caps.resolution_default;
    let _ = writeln!(ppd, "*DefaultResolution: {dx}x{dy}dpi");
    for (x, y) in &caps.resolutions {
        let _ = writeln!(ppd, "*Resolution {x}x{y}dpi/{x}x{y} DPI: \"\"");
    }
    let _ = writeln!(ppd, "*CloseUI: *Resolution");
}

/// `na_letter_8.5x11in` -> `na_letter_8.5x11in` as a PPD choice name: PPD
/// choices may not contain `.` or whitespace, so dots are dropped.
fn pwg_to_ppd_choice(pwg_keyword: &str) -> String {
    pwg_keyword.replace(['.', '-'], "")
}

fn ppd_color_choice(pwg_color_mode: &str) -> &'static str {
    match pwg_color_mode {
        "srgb_8" | "srgb_16" => "RGB",
        "sgray_8" | "sgray_16" => "Gray",
        "black_1" => "FastGray",
        _ => "RGB",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_model_name_and_page_sizes() {
        let caps = Capabilities::default();
        let ppd = generate_ipp_everywhere_ppd("Office Printer", &caps);
        assert!(ppd.contains("*ModelName: \"Office Printer\""));
        assert!(ppd.contains("*OpenUI *PageSize"));
        assert!(ppd.contains("*DefaultPageSize:"));
    }

    #[test]
    fn duplex_default_matches_capability_default() {
        let mut caps = Capabilities::default();
        caps.sides = vec!["one-sided".into(), "two-sided-long-edge".into()];
        caps.sides_default = "two-sided-long-edge".into();
        let ppd = generate_ipp_everywhere_ppd("Duplex Printer", &caps);
        assert!(ppd.contains("*DefaultDuplex: DuplexNoTumble"));
        assert!(ppd.contains("*Duplex DuplexNoTumble/Long-Edge"));
    }
}
