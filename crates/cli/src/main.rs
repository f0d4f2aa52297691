use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ems_core::adapters::http::{FileBundleSource, HttpBundleSource};
use ems_core::adapters::mail_store::FsMailStore;
use ems_core::adapters::pdf::CommandPdfConverter;
use ems_core::adapters::transmitter_from_config;
use ems_core::{
    naming, AdapterConfig, DispatchPipeline, EmailSettings, EncounterReport, HtmlReportRenderer,
    InboundPipeline, ReportRenderer, SectionLayout,
};
use fhir::Bundle;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ems")]
#[command(about = "EMS encounter report CLI")]
struct Cli {
    /// Locate composition sections by title instead of position
    #[arg(long, global = true)]
    by_title: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every report field for a bundle file
    Report {
        /// Bundle JSON file
        bundle: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the attachment filename for a bundle file
    Filename {
        /// Bundle JSON file
        bundle: PathBuf,
    },
    /// Render the HTML report for a bundle file
    Render {
        /// Bundle JSON file
        bundle: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Build and send the report for an encounter
    Send {
        /// Encounter reference (`Encounter/1`, an absolute URL or a bare id)
        encounter: String,
        /// Read the bundle from this file instead of the FHIR server
        #[arg(long)]
        bundle: Option<PathBuf>,
    },
    /// Re-send the report carried by a stored inbound email
    Receive {
        /// Notification JSON file
        notification: PathBuf,
    },
}

fn read_bundle(path: &Path) -> anyhow::Result<Bundle> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Bundle::from_json(&text).with_context(|| format!("failed to decode {}", path.display()))
}

fn layout(by_title: bool) -> SectionLayout {
    if by_title {
        SectionLayout::ByTitle
    } else {
        SectionLayout::Positional
    }
}

fn print_report(report: &EncounterReport<'_>, json: bool) -> anyhow::Result<()> {
    let summary = report.summary()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{} (created {})", summary.title, summary.created);
    println!("Encounter: {} [{}]", summary.encounter_id, summary.encounter_status);
    println!("Period: {}", summary.encounter_period);
    for location in &summary.encounter_location {
        println!("Location: {location}");
    }
    println!(
        "Patient: {}, born {}, {}",
        summary.patient_name, summary.patient_born, summary.patient_gender
    );
    for nhs in &summary.patient_nhs_numbers {
        println!("NHS number: {nhs}");
    }
    for gp in &summary.general_practitioner {
        println!("GP: {gp}");
    }
    println!("Owner: {}", summary.owner);
    println!(
        "Responsible: {} ({})",
        summary.responsible_party, summary.responsible_party_org
    );
    println!(
        "Consent: {} from {} to {}",
        summary.consent_status, summary.consent_obtained, summary.consent_expires
    );
    println!("Informant: {}", summary.informant);
    let address = &summary.informant_home_address;
    println!(
        "Informant address: {}, {}, {}, {}",
        address.first_line, address.second_line, address.city, address.postcode
    );
    println!(
        "Informant phones: mobile {}, home {}",
        summary.contact_points.mob_phone, summary.contact_points.home_phone
    );
    println!("Observation: {}", summary.observation);
    println!("Medication: {}", summary.medication_statement);
    println!("Allergies: {}", summary.allergy_intolerance);
    println!("Triage: {}", summary.triage_report);
    println!("Clinical impression: {}", summary.clinical_impression);
    println!(
        "Appointment: {} ({})",
        summary.appointment.description, summary.appointment.comment
    );
    for section in &summary.sections {
        println!("[{}] {}", section.title, section.text);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("ems=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let layout = layout(cli.by_title);

    match cli.command {
        Some(Commands::Report { bundle, json }) => {
            let bundle = read_bundle(&bundle)?;
            print_report(&EncounterReport::with_layout(&bundle, layout), json)?;
        }
        Some(Commands::Filename { bundle }) => {
            let bundle = read_bundle(&bundle)?;
            let report = EncounterReport::with_layout(&bundle, layout);
            println!("{}", naming::build_name(&report.patient())?);
        }
        Some(Commands::Render { bundle, out }) => {
            let bundle = read_bundle(&bundle)?;
            let report = EncounterReport::with_layout(&bundle, layout);
            let html = HtmlReportRenderer::new().render(&report)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, html)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{html}"),
            }
        }
        Some(Commands::Send { encounter, bundle }) => {
            let settings = EmailSettings::from_env()?;
            let config = AdapterConfig::from_env()?;
            let converter = CommandPdfConverter::new(config.pdf_command.clone());
            let transmitter = transmitter_from_config(&config)?;
            let renderer = HtmlReportRenderer::new();

            let pipeline = match bundle {
                Some(path) => DispatchPipeline::new(
                    settings,
                    FileBundleSource::new(path),
                    renderer,
                    converter,
                    transmitter,
                ),
                None => DispatchPipeline::new(
                    settings,
                    HttpBundleSource::new(config.fhir_base_url.clone(), config.http_timeout)?,
                    renderer,
                    converter,
                    transmitter,
                ),
            }
            .with_layout(layout);

            let outcome = pipeline.dispatch(&encounter);
            println!("{}", outcome.status_line());
            if !outcome.is_success() {
                bail!("dispatch failed for {encounter}");
            }
        }
        Some(Commands::Receive { notification }) => {
            let settings = EmailSettings::from_env()?;
            let config = AdapterConfig::from_env()?;
            let Some(store_dir) = config.mail_store_dir.clone() else {
                bail!("EMS_MAIL_STORE_DIR is not set");
            };
            let text = std::fs::read_to_string(&notification)
                .with_context(|| format!("failed to read {}", notification.display()))?;

            let pipeline = InboundPipeline::new(
                settings,
                FsMailStore::new(store_dir),
                CommandPdfConverter::new(config.pdf_command.clone()),
                transmitter_from_config(&config)?,
            );
            let outcome = pipeline.process(&text);
            println!("{}", outcome.status_line());
            if !outcome.is_success() {
                bail!("inbound processing failed");
            }
        }
        None => {
            println!("No command given. Use --help for usage.");
        }
    }

    Ok(())
}
