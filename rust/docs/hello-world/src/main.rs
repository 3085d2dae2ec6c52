// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Consumer example for the greenpass crates.
//!
//! Reads certificate text (the content of a scanned QR code) from files or
//! stdin and prints the verdict with the decoded certificate.

use std::io::Read as _;

use greenpass::{
    device_names, disease_name, inspect, manufacturer_name, parse_reference_time, vaccine_name, Certificate,
    CertificateKind, Diagnostics, VerificationOutcome, Verifier, VerifierConfig,
};
use greenpass_trust::{load_settings, DeviceNames};
use greenpass_validation::ValidationResult;
use tracing_subscriber::EnvFilter;

/// Read a file (or stdin for `-`) to a string or exit with a clear error.
fn read(path: &str) -> String {
    let result = if path == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).map(|_| text)
    } else {
        std::fs::read_to_string(path)
    };
    result.unwrap_or_else(|e| {
        eprintln!("failed to read {path}: {e}");
        std::process::exit(2);
    })
}

fn print_result(r: &ValidationResult) {
    println!("is_valid: {}", if r.is_valid { "true" } else { "false" });
    println!("validator: {}", r.validator_name);
    if !r.metadata.is_empty() {
        println!("metadata:");
        let mut keys: Vec<_> = r.metadata.keys().collect();
        keys.sort();
        for k in keys {
            println!("  {k}: {}", r.metadata[k]);
        }
    }
}

fn print_json(label: &str, value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{label}:\n{s}"),
        Err(e) => eprintln!("cannot render {label}: {e}"),
    }
}

fn print_signature(d: &Diagnostics) {
    print_json("protected headers", &d.protected_headers);
    print_json("unprotected headers", &d.unprotected_headers);
    let hex: String = d.signature.iter().map(|b| format!("{b:02x}")).collect();
    println!("signature: {hex}");
    if !d.non_base45_chars.is_empty() {
        println!("non base-45 characters: {:?}", d.non_base45_chars);
    }
}

fn print_certificate(c: &Certificate, devices: &DeviceNames) {
    let p = &c.personal_info;
    println!("name: {} {}", p.first_name, p.last_name);
    println!("date of birth: {}", p.date_of_birth);
    println!("issued by: {} on {}", c.qr_info.issuing_country, c.qr_info.release_date);
    println!("expires: {}", c.qr_info.expiration_date);
    println!("kind: {}", c.kind.name());

    match &c.kind {
        CertificateKind::Vaccine(v) => {
            println!("disease: {}", disease_name(&v.info.target_disease));
            if let Some(product) = &v.product {
                println!("vaccine: {}", vaccine_name(product));
            }
            if let Some(ma) = &v.manufacturer {
                println!("manufacturer: {}", manufacturer_name(ma, devices));
            }
            println!("dose: {}/{}", v.dose_number, v.total_doses);
            println!("vaccinated: {}", v.vaccination_date);
        }
        CertificateKind::Test(t) => {
            println!("disease: {}", disease_name(&t.info.target_disease));
            println!("test: {}", t.test_type);
            if let Some(ma) = &t.manufacturer {
                println!("device: {}", manufacturer_name(ma, devices));
            }
            println!("collected: {}", t.collection_date);
            if let Some(result) = &t.result {
                println!("result: {result}");
            }
            if let Some(center) = &t.testing_center {
                println!("testing center: {center}");
            }
        }
        CertificateKind::Recovery(r) => {
            println!("disease: {}", disease_name(&r.info.target_disease));
            println!("valid from: {}", r.valid_from);
            println!("valid until: {}", r.valid_until);
        }
        CertificateKind::Unknown => {}
    }

    if let Some(info) = c.kind.info() {
        println!("certificate id: {}", info.certificate_id);
    }
    if let (Some(since), Some(until)) = (c.hours_to_valid(), c.remaining_hours()) {
        println!("hours since valid: {since}");
        println!("hours remaining: {until}");
    }
    if c.blocklisted() {
        println!("blocklisted: true");
    }
}

fn print_outcome(o: &VerificationOutcome, devices: &DeviceNames, dump_sign: bool) {
    print_certificate(&o.certificate, devices);
    if dump_sign {
        print_signature(&o.diagnostics);
    }
    if let Some(check) = &o.diagnostics.signature_check {
        print_result(check);
    }
    if !o.diagnostics.failures.is_empty() {
        println!("failures:");
        for failure in &o.diagnostics.failures {
            println!("- {failure}");
        }
    }
    println!("verdict: {}", if o.verdict { "VALID" } else { "NOT VALID" });
}

fn get_arg_value(args: &[String], name: &str) -> Option<String> {
    get_arg_values(args, name).into_iter().next()
}

fn get_arg_values(args: &[String], name: &str) -> Vec<String> {
    args.windows(2)
        .filter(|w| w[0] == name)
        .map(|w| w[1].clone())
        .collect()
}

fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}

fn usage_and_exit(exe: &str) -> ! {
    eprintln!("Usage:");
    eprintln!(
        "  {exe} verify --txt <file|-> [--txt <file>...] [--dump-sign] [--key <file>] [--no-block-list] [--recovery-expiration] [--at-date <YYYY-MM-DD[-HH:MM[:SS]][+HH[:MM]]>] [--trust-list <url>] [--cachedir <dir> | --no-cache]"
    );
    eprintln!("  {exe} raw --txt <file|->");
    eprintln!("  {exe} settings [--cachedir <dir> | --no-cache]");
    eprintln!("  {exe} clear-cache [--cachedir <dir>]");
    std::process::exit(2);
}

fn config_from_args(args: &[String]) -> VerifierConfig {
    let mut config = VerifierConfig::default();
    if let Some(dir) = get_arg_value(args, "--cachedir") {
        config = config.with_cache_dir(dir);
    }
    if has_flag(args, "--no-cache") {
        config = config.without_cache();
    }
    if let Some(key) = get_arg_value(args, "--key") {
        config = config.with_key_override(key);
    }
    if let Some(url) = get_arg_value(args, "--trust-list") {
        config = config.with_dgc_trust_list(url);
    }
    if has_flag(args, "--no-block-list") {
        config = config.with_blocklist(false);
    }
    if has_flag(args, "--recovery-expiration") {
        config = config.with_recovery_expiration(true);
    }
    if let Some(at) = get_arg_value(args, "--at-date") {
        let at = parse_reference_time(&at).unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(2);
        });
        config = config.with_reference_time(at);
    }
    config
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let exe = args.first().map(|s| s.as_str()).unwrap_or("greenpass_hello_world");
    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("");
    if mode.is_empty() {
        usage_and_exit(exe);
    }

    if mode == "verify" {
        let paths = get_arg_values(&args, "--txt");
        if paths.is_empty() {
            usage_and_exit(exe);
        }
        let texts: Vec<String> = paths.iter().map(|p| read(p)).collect();

        let config = config_from_args(&args);
        let verifier = Verifier::from_config(&config).unwrap_or_else(|e| {
            eprintln!("cannot initialise verifier: {e}");
            std::process::exit(1);
        });
        let devices = device_names(&config);

        let batch = verifier.verify_batch(&texts);
        for (path, outcome) in paths.iter().zip(&batch.outcomes) {
            if paths.len() > 1 {
                println!("== {path}");
            }
            print_outcome(outcome, &devices, has_flag(&args, "--dump-sign"));
        }
        if paths.len() > 1 {
            println!("batch verdict: {}", if batch.verdict { "VALID" } else { "NOT VALID" });
        }
        std::process::exit(if batch.verdict { 0 } else { 3 });
    }

    if mode == "raw" {
        let path = get_arg_value(&args, "--txt").unwrap_or_default();
        if path.is_empty() {
            usage_and_exit(exe);
        }
        let diagnostics = inspect(&read(&path)).unwrap_or_else(|e| {
            eprintln!("decode failed: {e}");
            std::process::exit(1);
        });
        print_signature(&diagnostics);
        if let Some(payload) = &diagnostics.payload {
            print_json("payload", payload);
        }
        return;
    }

    if mode == "settings" {
        let config = config_from_args(&args);
        let cache = config.open_cache().unwrap_or_else(|e| {
            eprintln!("{e}");
            std::process::exit(1);
        });
        let settings = load_settings(&config.http_client(), &config.dgc_base_url, cache.as_ref())
            .unwrap_or_else(|e| {
                eprintln!("settings unavailable: {e}");
                std::process::exit(1);
            });
        match serde_json::to_string_pretty(&settings) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("cannot render settings: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    if mode == "clear-cache" {
        let config = config_from_args(&args);
        match config.clear_cache() {
            Ok(removed) => println!("removed {removed} cached entries"),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        return;
    }

    usage_and_exit(exe);
}
