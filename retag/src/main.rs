#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls, clippy::missing_panics_doc)]

mod minicli;
mod musicfiles;

use std::{
    env,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::{bail, Context};
use log::{error, info};
use minicli::{process_args, CliResult, Command, CoverArg, TagOptions};
use serde::Deserialize;
use tagrewrite::{
    BatchReport, CoverChange, CoverOptions, RewriteJob, StagingArea, TagRecord, TagRewriter,
    Version,
};

#[tokio::main]
async fn main() -> ExitCode {
    colog::init();

    let (config_path, command) = match process_args(env::args().skip(1)) {
        CliResult::Exit => return ExitCode::SUCCESS,
        CliResult::Error => return ExitCode::FAILURE,
        CliResult::Run { config, command } => (config, command),
    };

    let config_path =
        config_path.or_else(|| env::var_os("RETAG_CONFIG_FILE").map(PathBuf::from));
    let config = match RtConfig::load(config_path) {
        Ok(config) => config,
        Err(err) => {
            error!("{err:?}");
            return ExitCode::FAILURE;
        }
    };

    match run(&config, command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

/// Runs one command. Returns `false` when any file failed.
async fn run(config: &RtConfig, command: Command) -> anyhow::Result<bool> {
    let rewriter = Arc::new(TagRewriter::with_version(config.rewrite.tag_version));

    match command {
        Command::Tag { file, options } => {
            let record = build_record(config, options)?;
            let report = tagrewrite::rewrite_batch(
                rewriter,
                vec![RewriteJob { path: file, record }],
                1,
            )
            .await;
            Ok(print_report(&report))
        }
        Command::Cover { image, inputs } => {
            let cover = load_cover(config, &image)?;
            let files = mp3s_in(&inputs)?;
            info!("Replacing cover of {} file(s)", files.len());
            let report =
                tagrewrite::replace_cover_all(rewriter, files, cover, config.rewrite.workers).await;
            Ok(print_report(&report))
        }
        Command::Album { album, inputs } => {
            let files = mp3s_in(&inputs)?;
            info!("Setting album of {} file(s) to {album:?}", files.len());
            let jobs = tagrewrite::album_for_all(files, &album);
            let report = tagrewrite::rewrite_batch(rewriter, jobs, config.rewrite.workers).await;
            Ok(print_report(&report))
        }
        Command::Number { inputs } => {
            let files = mp3s_in(&inputs)?;
            info!("Numbering {} file(s)", files.len());
            let jobs = tagrewrite::auto_track_numbers(files);
            let report = tagrewrite::rewrite_batch(rewriter, jobs, config.rewrite.workers).await;
            Ok(print_report(&report))
        }
        Command::Show { files } => {
            let mut ok = true;
            for file in files {
                match tagrewrite::read_current(&file) {
                    Ok(tags) => {
                        println!("{}", file.display());
                        println!("  title:    {}", tags.title.as_deref().unwrap_or(""));
                        println!("  artist:   {}", tags.artist.as_deref().unwrap_or(""));
                        println!("  album:    {}", tags.album.as_deref().unwrap_or(""));
                        println!(
                            "  track:    {}",
                            tags.track.map(|t| t.to_string()).unwrap_or_default()
                        );
                        println!("  year:     {}", tags.year.as_deref().unwrap_or(""));
                        println!("  genre:    {}", tags.genre.as_deref().unwrap_or(""));
                        println!("  pictures: {}", tags.picture_count);
                    }
                    Err(err) => {
                        error!("{err}");
                        ok = false;
                    }
                }
            }
            Ok(ok)
        }
        Command::Guess { names } => {
            for name in names {
                let guess = tagrewrite::guess_from_filename(&name);
                println!("{name}\n  artist: {}\n  title:  {}", guess.artist, guess.title);
            }
            Ok(true)
        }
        Command::Stage { files } => {
            let area = StagingArea::create(&config.paths.staging)
                .context("When creating staging batch")?;
            let mut ok = true;
            for file in &files {
                if let Err(err) = area.stage_file(file) {
                    error!("{err}");
                    ok = false;
                }
            }
            println!("{}", area.dir().display());
            Ok(ok)
        }
    }
}

fn mp3s_in(inputs: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let files = musicfiles::collect_mp3s(inputs);
    if files.is_empty() {
        bail!("No mp3 files found");
    }
    Ok(files)
}

fn build_record(config: &RtConfig, options: TagOptions) -> anyhow::Result<TagRecord> {
    let cover = match options.cover {
        CoverArg::Keep => CoverChange::Keep,
        CoverArg::Clear => CoverChange::Clear,
        CoverArg::Image(path) => CoverChange::Replace(load_cover(config, &path)?),
    };
    Ok(TagRecord {
        title: options.title,
        artist: options.artist,
        album: options.album,
        track: options.track,
        year: options.year,
        cover,
    })
}

fn load_cover(config: &RtConfig, path: &Path) -> anyhow::Result<tagrewrite::CoverArt> {
    let data =
        std::fs::read(path).with_context(|| format!("When reading cover {}", path.display()))?;
    tagrewrite::normalize_cover(&data, &config.cover.options())
        .with_context(|| format!("When preparing cover {}", path.display()))
}

fn print_report(report: &BatchReport) -> bool {
    println!("Successful: {}", report.succeeded.len());
    println!("Failed: {}", report.failed.len());
    for failure in &report.failed {
        println!("  - {}: {}", failure.path.display(), failure.error);
    }
    report.is_success()
}

#[derive(Deserialize, Default)]
pub struct RtConfig {
    #[serde(default)]
    pub paths: RtPaths,
    #[serde(default)]
    pub cover: RtCover,
    #[serde(default)]
    pub rewrite: RtRewrite,
}

#[derive(Deserialize)]
pub struct RtPaths {
    /// Root under which every staging batch gets its own directory.
    #[serde(default = "RtConfig::default_staging")]
    pub staging: PathBuf,
}

#[derive(Deserialize)]
pub struct RtCover {
    /// Longest edge of embedded covers in pixels.
    #[serde(default = "RtConfig::default_max_dimension")]
    pub max_dimension: u32,
    #[serde(default = "RtConfig::default_quality")]
    pub quality: u8,
}

#[derive(Deserialize)]
pub struct RtRewrite {
    /// Files rewritten at the same time.
    #[serde(default = "RtConfig::default_workers")]
    pub workers: usize,
    #[serde(deserialize_with = "RtConfig::parse_version")]
    #[serde(default = "RtConfig::default_tag_version")]
    pub tag_version: Version,
}

impl Default for RtPaths {
    fn default() -> Self {
        Self {
            staging: RtConfig::default_staging(),
        }
    }
}

impl Default for RtCover {
    fn default() -> Self {
        Self {
            max_dimension: RtConfig::default_max_dimension(),
            quality: RtConfig::default_quality(),
        }
    }
}

impl Default for RtRewrite {
    fn default() -> Self {
        Self {
            workers: RtConfig::default_workers(),
            tag_version: RtConfig::default_tag_version(),
        }
    }
}

impl RtCover {
    const fn options(&self) -> CoverOptions {
        CoverOptions {
            max_dimension: self.max_dimension,
            quality: self.quality,
        }
    }
}

impl RtConfig {
    /// Reads `path` if given; otherwise `retag.toml` when present, else defaults.
    fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::read(&path),
            None => {
                let default = Path::new("retag.toml");
                if default.exists() {
                    Self::read(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(config_path: &Path) -> anyhow::Result<Self> {
        let config = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config at {}", config_path.display()))?;
        Self::parse(&config)
    }

    fn parse(config: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(config)?;
        if config.rewrite.workers == 0 {
            bail!("rewrite.workers must be at least 1");
        }
        Ok(config)
    }

    fn default_staging() -> PathBuf {
        "staging".into()
    }

    const fn default_max_dimension() -> u32 {
        800
    }

    const fn default_quality() -> u8 {
        90
    }

    const fn default_workers() -> usize {
        2
    }

    const fn default_tag_version() -> Version {
        Version::Id3v23
    }

    fn parse_version<'de, D>(deserializer: D) -> Result<Version, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let version = String::deserialize(deserializer)
            .map_err(|_| serde::de::Error::custom("Invalid tag version. Expected string"))?;
        match version.trim().trim_start_matches("ID3v").trim_start_matches("2.") {
            "3" => Ok(Version::Id3v23),
            "4" => Ok(Version::Id3v24),
            _ => Err(serde::de::Error::custom(format!(
                "Tag version {version} is not supported, use \"2.3\" or \"2.4\""
            ))),
        }
    }
}
