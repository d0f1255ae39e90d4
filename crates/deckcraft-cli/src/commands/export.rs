//! Export command handlers

use anyhow::{bail, Result};

use deckcraft_core::{
    CardDocument, CardId, Config, Deck, ExportItem, ExportOutcome, ExportPipeline, ZipArchiver,
};

use crate::output::{Output, OutputFormat};
use crate::render::CardSurface;
use crate::sink::ConsoleSink;

/// Pipeline configured from the user's settings
pub fn pipeline(config: &Config) -> ExportPipeline {
    ExportPipeline::new(
        ZipArchiver::new(config.compression_level),
        config.export_options(),
    )
}

/// One off-screen surface per stored card, in deck order
pub fn deck_items(deck: &Deck) -> Vec<ExportItem<CardSurface>> {
    deck.cards()
        .iter()
        .map(|(id, doc)| ExportItem::new(id.export_name(), CardSurface::card(*id, doc.clone())))
        .collect()
}

/// Export a single card as PNG
pub fn card(
    pipeline: &ExportPipeline,
    deck: &Deck,
    config: &Config,
    id: CardId,
    output: &Output,
) -> Result<()> {
    let doc = deck.card(id).cloned().unwrap_or_else(CardDocument::new);
    let mut surface = CardSurface::card(id, doc).shown().without_chrome();
    let mut sink = ConsoleSink::new(config.export_dir(), output);

    let filename = id.export_filename(deck.name());
    if pipeline.export_one(&mut surface, &filename, &mut sink).is_none() {
        bail!(failure_message(&sink, "Failed to export card"));
    }

    report_written(&sink, output);
    Ok(())
}

/// Export every stored card into one archive
pub fn deck(pipeline: &ExportPipeline, deck: &Deck, config: &Config, output: &Output) -> Result<()> {
    let mut items = deck_items(deck);
    let mut sink = ConsoleSink::new(config.export_dir(), output);

    match pipeline.export_many(&mut items, deck.name(), &mut sink) {
        ExportOutcome::Busy => {
            output.warn("An export is already running");
        }
        ExportOutcome::NothingToExport => {}
        ExportOutcome::Failed => {
            bail!(failure_message(&sink, "Failed to export deck"));
        }
        ExportOutcome::Completed(report) => {
            let written = sink.written().last().cloned();
            drop(sink);
            match output.format {
                OutputFormat::Json => output.json(&serde_json::json!({
                    "archive": written,
                    "exported": report.exported,
                    "skipped": report.skipped,
                })),
                OutputFormat::Quiet => {
                    if let Some(path) = written {
                        println!("{}", path.display());
                    }
                }
                OutputFormat::Human => {
                    let location = written
                        .map(|p| p.display().to_string())
                        .unwrap_or(report.archive);
                    output.success(&format!(
                        "Exported {} card(s) to {}",
                        report.exported.len(),
                        location
                    ));
                    if !report.skipped.is_empty() {
                        output.warn(&format!(
                            "Skipped {} card(s) that failed to render: {}",
                            report.skipped.len(),
                            report.skipped.join(", ")
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

fn failure_message(sink: &ConsoleSink<'_>, fallback: &str) -> String {
    sink.failures()
        .last()
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

fn report_written(sink: &ConsoleSink<'_>, output: &Output) {
    for path in sink.written() {
        match output.format {
            OutputFormat::Json => output.json(&serde_json::json!({"file": path})),
            OutputFormat::Quiet => println!("{}", path.display()),
            OutputFormat::Human => output.success(&format!("Exported {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use deckcraft_core::document::fields;
    use serde_json::json;
    use std::fs::File;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn setup(temp: &TempDir) -> (Config, Deck) {
        let config = Config {
            data_dir: temp.path().join("data"),
            export_dir: Some(temp.path().join("out")),
            ..Config::default()
        };
        let mut deck = Deck::open_with_config(&config).unwrap();
        deck.load();
        (config, deck)
    }

    fn title(t: &str) -> CardDocument {
        CardDocument::from_pairs([(fields::TITLE, json!(t))])
    }

    #[test]
    fn test_export_deck_writes_archive() {
        let temp = TempDir::new().unwrap();
        let (config, mut deck) = setup(&temp);
        deck.set_name("Test Deck");
        deck.update_card("spades-K".parse().unwrap(), &title("King"));
        deck.update_card("hearts-A".parse().unwrap(), &title("Ace"));

        let output = Output::new(OutputFormat::Quiet);
        deck_export(&config, &deck, &output);

        let file = File::open(temp.path().join("out").join("Test Deck.zip")).unwrap();
        let mut archive = ZipArchive::new(file).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["A_of_hearts.png", "K_of_spades.png"]);
    }

    fn deck_export(config: &Config, d: &Deck, output: &Output) {
        deck(&pipeline(config), d, config, output).unwrap();
    }

    #[test]
    fn test_export_empty_deck_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let (config, d) = setup(&temp);
        let output = Output::new(OutputFormat::Quiet);

        deck_export(&config, &d, &output);
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_export_card_uses_deck_name() {
        let temp = TempDir::new().unwrap();
        let (config, d) = setup(&temp);
        let output = Output::new(OutputFormat::Quiet);

        card(&pipeline(&config), &d, &config, "diamonds-10".parse().unwrap(), &output).unwrap();

        let path = temp
            .path()
            .join("out")
            .join("My Custom Deck_10_of_diamonds.png");
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
