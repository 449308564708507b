use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

// Build version with decoder info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Decode: image 0.25 (png, jpeg, webp, tiff, tga, bmp)\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Frame-sequence scrubbing engine
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Enable debug logging to file (default: framescrub.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE", global = true)]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Drive the engine headless and print a summary
    Run(RunArgs),
    /// Validate a scene and report missing frame files
    Check(SceneArgs),
    /// Convert one image into an ASCII PLY point cloud
    Pointcloud(PointCloudArgs),
}

/// Scene selection shared by `run` and `check`
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct SceneArgs {
    /// Scene JSON file (default: scene.json in the config directory)
    #[arg(short = 's', long = "scene", value_name = "FILE", conflicts_with = "preset")]
    pub scene: Option<PathBuf>,

    /// Built-in scene: pier-house, model-zentro
    #[arg(short = 'p', long = "preset", value_name = "NAME")]
    pub preset: Option<String>,

    /// Override the frame directory of the scene
    #[arg(long = "frames-dir", value_name = "DIR")]
    pub frames_dir: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub scene: SceneArgs,

    /// Number of ticks to run
    #[arg(short = 'n', long = "ticks", value_name = "N", default_value_t = 300)]
    pub ticks: u64,

    /// Tick rate in Hz (0 = as fast as possible)
    #[arg(long = "fps", value_name = "F", default_value_t = 60.0)]
    pub fps: f64,

    /// Scripted intent, e.g. 10:play, 120:goto=playa, 30:drag=-50 (repeatable)
    #[arg(long = "at", value_name = "TICK:INTENT[=ARG]")]
    pub at: Vec<ScriptedIntent>,

    /// Load frames on the ticking thread instead of the worker pool
    #[arg(long = "sync-load")]
    pub sync_load: bool,

    /// Loader threads (default: CPU count - 1)
    #[arg(long = "workers", value_name = "N")]
    pub workers: Option<usize>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PointCloudArgs {
    /// Source image
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Sample every N-th pixel
    #[arg(long = "skip", value_name = "N", default_value_t = 4)]
    pub skip: u32,

    /// Z displacement per unit brightness
    #[arg(long = "depth-scale", value_name = "F", default_value_t = 0.5)]
    pub depth_scale: f32,

    /// Output file (default: IMAGE with .ply extension)
    #[arg(short = 'o', long = "out", value_name = "FILE.ply")]
    pub out: Option<PathBuf>,
}

/// Host action for the headless runner
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Start,
    Middle,
    End,
    Play,
    Stop,
    ZoomIn,
    ZoomOut,
    GoTo(String),
    /// Press, move by dx pixels, release
    Drag(f64),
    /// Wheel with delta_y
    Wheel(f64),
}

/// `TICK:INTENT[=ARG]`, applied before tick number TICK runs
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedIntent {
    pub tick: u64,
    pub intent: Intent,
}

impl FromStr for ScriptedIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tick, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("expected TICK:INTENT, got '{}'", s))?;
        let tick = tick
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("bad tick '{}': {}", tick, e))?;
        let (name, arg) = match rest.split_once('=') {
            Some((n, a)) => (n.trim(), Some(a.trim())),
            None => (rest.trim(), None),
        };

        let number = |arg: Option<&str>| -> Result<f64, String> {
            let a = arg.ok_or_else(|| format!("'{}' needs a numeric argument", name))?;
            a.parse::<f64>().map_err(|e| format!("bad number '{}': {}", a, e))
        };

        let intent = match name.to_ascii_lowercase().as_str() {
            "start" => Intent::Start,
            "middle" => Intent::Middle,
            "end" => Intent::End,
            "play" => Intent::Play,
            "stop" => Intent::Stop,
            "zoom-in" | "zoomin" => Intent::ZoomIn,
            "zoom-out" | "zoomout" => Intent::ZoomOut,
            "goto" | "go-to" => match arg {
                Some(section) if !section.is_empty() => Intent::GoTo(section.to_string()),
                _ => return Err("'goto' needs a section name".to_string()),
            },
            "drag" => Intent::Drag(number(arg)?),
            "wheel" => Intent::Wheel(number(arg)?),
            other => return Err(format!("unknown intent '{}'", other)),
        };
        Ok(Self { tick, intent })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<ScriptedIntent, String> {
        s.parse()
    }

    #[test]
    fn test_parse_intents() {
        assert_eq!(parse("0:play").unwrap(), ScriptedIntent { tick: 0, intent: Intent::Play });
        assert_eq!(parse("12:zoom-in").unwrap().intent, Intent::ZoomIn);
        assert_eq!(parse("5:goto=playa").unwrap().intent, Intent::GoTo("playa".into()));
        assert_eq!(parse("7:drag=-50").unwrap().intent, Intent::Drag(-50.0));
        assert_eq!(parse("7:wheel=120.5").unwrap().intent, Intent::Wheel(120.5));
        assert_eq!(parse(" 3 : End ").unwrap(), ScriptedIntent { tick: 3, intent: Intent::End });
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("play").is_err());
        assert!(parse("x:play").is_err());
        assert!(parse("-1:play").is_err());
        assert!(parse("1:dance").is_err());
        assert!(parse("1:goto").is_err());
        assert!(parse("1:drag").is_err());
        assert!(parse("1:drag=left").is_err());
    }

    #[test]
    fn test_cli_run() {
        let args = Args::try_parse_from([
            "framescrub", "-vv", "run", "--preset", "pier-house", "--ticks", "20", "--at", "3:play", "--at",
            "10:goto=casa", "--sync-load",
        ])
        .unwrap();
        assert_eq!(args.verbosity, 2);
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.scene.preset.as_deref(), Some("pier-house"));
                assert_eq!(run.ticks, 20);
                assert_eq!(run.at.len(), 2);
                assert!(run.sync_load);
                assert_eq!(run.fps, 60.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cli_scene_and_preset_conflict() {
        let res = Args::try_parse_from(["framescrub", "check", "--scene", "a.json", "--preset", "pier-house"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_cli_pointcloud_and_log_flag() {
        let args = Args::try_parse_from(["framescrub", "pointcloud", "img.png", "--skip", "2", "--log"]).unwrap();
        assert_eq!(args.log_file, Some(None));
        match args.command {
            Command::Pointcloud(pc) => {
                assert_eq!(pc.image, PathBuf::from("img.png"));
                assert_eq!(pc.skip, 2);
                assert_eq!(pc.depth_scale, 0.5);
                assert_eq!(pc.out, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
