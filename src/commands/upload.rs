use crate::commands::rename::archive_photos;
use crate::select::{find_cards, media_files};
use crate::utils::AppConfig;
use anyhow::Result;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

pub fn cmd_upload(config: &AppConfig, cards: &[PathBuf], yes: bool) -> Result<()> {
    let cards = if cards.is_empty() {
        find_cards(&config.flash_card)?
    } else {
        cards.to_vec()
    };
    if cards.is_empty() {
        return Err(anyhow::anyhow!("Error: No SD card(s) currently inserted"));
    }

    if !yes {
        let stdin = io::stdin();
        if !confirm(&cards, &mut stdin.lock(), &mut io::stdout())? {
            println!("Ok, nevermind, exiting...");
            return Ok(());
        }
    }

    let mut photos = Vec::new();
    for card in &cards {
        log::debug!("Uploading from card: {}", card.display());
        photos.extend(media_files(card));
    }

    if photos.is_empty() {
        println!("No photos found on {:?}", cards);
        return Ok(());
    }

    archive_photos(config, &photos)?;
    Ok(())
}

fn confirm(cards: &[PathBuf], input: &mut impl BufRead, out: &mut impl Write) -> Result<bool> {
    let s = if cards.len() == 1 { "" } else { "s" };
    writeln!(out)?;
    write!(
        out,
        "{} ",
        format!("Upload photos from attached SD card{} {:?} (y/n)?", s, cards).bold()
    )?;
    out.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    answer.starts_with(['y', 'Y'])
}
