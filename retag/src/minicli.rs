use std::path::PathBuf;

use tagrewrite::{data::year_prefix, TrackNumber};

const USAGE: &str = "\
usage: retag [--config <path>] <command>

commands:
  tag <file> [--title T] [--artist A] [--album B] [--track N[/M]] [--year Y]
             [--cover <image> | --clear-cover]
  cover <image> <file-or-dir>...   replace the cover of every mp3
  album <name> <file-or-dir>...    set one album on every mp3
  number <file-or-dir>...          number every mp3 1..N in path order
  show <file>...                   print current tags
  guess <filename>...              print the artist/title guessed from a name
  stage <file>...                  copy files into a new staging batch
  help";

pub fn process_args<I: IntoIterator<Item = String>>(args: I) -> CliResult {
    let args: Vec<String> = args.into_iter().collect();
    let mut args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();

    let mut config = None;
    if let Some((&"--config", rest)) = args.split_first() {
        let Some((path, rest)) = rest.split_first() else {
            return ret_error("missing <config_path>");
        };
        config = Some(PathBuf::from(path));
        args = rest.to_vec();
    }

    let command = match args.split_first() {
        None | Some((&"help", _)) => {
            println!("{USAGE}");
            return CliResult::Exit;
        }
        Some((&"tag", args)) => {
            let Some((file, args)) = args.split_first() else {
                return ret_error("missing <file>");
            };
            match parse_tag_options(args) {
                Ok(options) => Command::Tag {
                    file: PathBuf::from(file),
                    options,
                },
                Err(msg) => return ret_error(&msg),
            }
        }
        Some((&"cover", args)) => {
            let Some((image, inputs)) = args.split_first() else {
                return ret_error("missing <image>");
            };
            if inputs.is_empty() {
                return ret_error("missing <file-or-dir>");
            }
            Command::Cover {
                image: PathBuf::from(image),
                inputs: inputs.iter().map(PathBuf::from).collect(),
            }
        }
        Some((&"album", args)) => {
            let Some((album, inputs)) = args.split_first() else {
                return ret_error("missing <name>");
            };
            if inputs.is_empty() {
                return ret_error("missing <file-or-dir>");
            }
            Command::Album {
                album: (*album).to_string(),
                inputs: inputs.iter().map(PathBuf::from).collect(),
            }
        }
        Some((&"number", inputs)) => {
            if inputs.is_empty() {
                return ret_error("missing <file-or-dir>");
            }
            Command::Number {
                inputs: inputs.iter().map(PathBuf::from).collect(),
            }
        }
        Some((&"show", files)) => {
            if files.is_empty() {
                return ret_error("missing <file>");
            }
            Command::Show {
                files: files.iter().map(PathBuf::from).collect(),
            }
        }
        Some((&"guess", names)) => {
            if names.is_empty() {
                return ret_error("missing <filename>");
            }
            Command::Guess {
                names: names.iter().map(|n| (*n).to_string()).collect(),
            }
        }
        Some((&"stage", files)) => {
            if files.is_empty() {
                return ret_error("missing <file>");
            }
            Command::Stage {
                files: files.iter().map(PathBuf::from).collect(),
            }
        }
        Some((other, _)) => return ret_error(&format!("Invalid cli param {other:?}")),
    };

    CliResult::Run { config, command }
}

fn parse_tag_options(mut args: &[&str]) -> Result<TagOptions, String> {
    let mut options = TagOptions::default();
    while let Some((&flag, rest)) = args.split_first() {
        if flag == "--clear-cover" {
            options.cover = CoverArg::Clear;
            args = rest;
            continue;
        }
        let Some((&value, rest)) = rest.split_first() else {
            return Err(format!("missing value for {flag}"));
        };
        match flag {
            "--title" => options.title = Some(value.to_string()),
            "--artist" => options.artist = Some(value.to_string()),
            "--album" => options.album = Some(value.to_string()),
            "--year" => {
                if year_prefix(value).is_none() {
                    return Err(format!("invalid year {value:?}, expected YYYY"));
                }
                options.year = Some(value.trim().to_string());
            }
            "--track" => {
                options.track = Some(
                    TrackNumber::parse(value).ok_or_else(|| format!("invalid track {value:?}"))?,
                );
            }
            "--cover" => options.cover = CoverArg::Image(PathBuf::from(value)),
            _ => return Err(format!("unknown option {flag}")),
        }
        args = rest;
    }
    Ok(options)
}

fn ret_error(log: &str) -> CliResult {
    println!("{log}");
    println!("{USAGE}");
    CliResult::Error
}

#[derive(Debug, PartialEq, Eq)]
pub enum CliResult {
    Exit,
    Error,
    Run {
        config: Option<PathBuf>,
        command: Command,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Tag { file: PathBuf, options: TagOptions },
    Cover { image: PathBuf, inputs: Vec<PathBuf> },
    Album { album: String, inputs: Vec<PathBuf> },
    Number { inputs: Vec<PathBuf> },
    Show { files: Vec<PathBuf> },
    Guess { names: Vec<String> },
    Stage { files: Vec<PathBuf> },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TagOptions {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track: Option<TrackNumber>,
    pub year: Option<String>,
    pub cover: CoverArg,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub enum CoverArg {
    #[default]
    Keep,
    Clear,
    Image(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(args: &[&str]) -> CliResult {
        process_args(args.iter().map(|a| (*a).to_string()))
    }

    #[test]
    fn tag_with_options() {
        let res = run(&[
            "tag", "a.mp3", "--title", "", "--track", "3/12", "--cover", "c.png",
        ]);
        let CliResult::Run { config, command } = res else {
            panic!("expected run");
        };
        assert_eq!(config, None);
        assert_eq!(
            command,
            Command::Tag {
                file: "a.mp3".into(),
                options: TagOptions {
                    title: Some(String::new()),
                    track: Some(TrackNumber::of(3, 12)),
                    cover: CoverArg::Image("c.png".into()),
                    ..TagOptions::default()
                },
            }
        );
    }

    #[test]
    fn config_flag_comes_first() {
        let res = run(&["--config", "x.toml", "show", "a.mp3"]);
        assert_eq!(
            res,
            CliResult::Run {
                config: Some("x.toml".into()),
                command: Command::Show {
                    files: vec!["a.mp3".into()]
                },
            }
        );
    }

    #[test]
    fn bad_input_is_an_error() {
        assert_eq!(run(&["tag", "a.mp3", "--track", "x"]), CliResult::Error);
        assert_eq!(run(&["tag", "a.mp3", "--title"]), CliResult::Error);
        assert_eq!(run(&["tag", "a.mp3", "--year", "abc"]), CliResult::Error);
        assert_eq!(run(&["album", "Greatest Hits"]), CliResult::Error);
        assert_eq!(run(&["number"]), CliResult::Error);
        assert_eq!(run(&["cover", "c.jpg"]), CliResult::Error);
        assert_eq!(run(&["bogus"]), CliResult::Error);
        assert_eq!(run(&[]), CliResult::Exit);
    }

    #[test]
    fn year_is_validated() {
        let CliResult::Run { command, .. } = run(&["tag", "a.mp3", "--year", "1975-11-21"]) else {
            panic!("expected run");
        };
        let Command::Tag { options, .. } = command else {
            panic!("expected tag");
        };
        assert_eq!(options.year.as_deref(), Some("1975-11-21"));
    }

    #[test]
    fn batch_commands() {
        assert_eq!(
            run(&["album", "Greatest Hits", "music"]),
            CliResult::Run {
                config: None,
                command: Command::Album {
                    album: "Greatest Hits".into(),
                    inputs: vec!["music".into()],
                },
            }
        );
        assert_eq!(
            run(&["number", "a.mp3", "b.mp3"]),
            CliResult::Run {
                config: None,
                command: Command::Number {
                    inputs: vec!["a.mp3".into(), "b.mp3".into()],
                },
            }
        );
    }
}
