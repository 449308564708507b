//! Headless driver behind the `run`, `check` and `pointcloud` commands.

use anyhow::{bail, Context, Result};
use log::{debug, info, trace, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cli::{Args, Command, Intent, PointCloudArgs, RunArgs, SceneArgs, ScriptedIntent};
use crate::config::{self, PathConfig, SceneConfig};
use crate::core::{
    downcast_event, CacheStats, EngineSnapshot, FrameIndex, ImageLoader, InlineExecutor, LoadExecutor,
    PlaneTransform, PointerEvent, RenderSurface, ResourceFailed, ScrubEngine, SurfaceError, Texture,
    TickFault, TickOutcome, UnknownSection, Workers,
};
use crate::point_cloud::{image_to_point_cloud, write_ply, PointCloudParams};

/// Surface that only logs what a real renderer would do
#[derive(Debug, Default)]
pub struct LogSurface {
    pub swaps: u64,
    pub draws: u64,
    pub camera_distance: f64,
    pub last_size: Option<(u32, u32)>,
    pub released: bool,
}

impl RenderSurface<Texture> for LogSurface {
    fn set_resource(&mut self, resource: &Texture, plane: PlaneTransform) {
        self.swaps += 1;
        self.last_size = Some((resource.width, resource.height));
        trace!(
            "Surface: texture {}x{} on plane {:?}",
            resource.width, resource.height, plane.size
        );
    }

    fn mark_dirty(&mut self) {}

    fn set_camera_distance(&mut self, distance: f64) {
        self.camera_distance = distance;
    }

    fn draw(&mut self) -> Result<(), SurfaceError> {
        self.draws += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
        debug!("Surface released after {} draws", self.draws);
    }
}

/// Outcome of a headless run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub scene: String,
    pub ticks: u64,
    pub faults: u64,
    pub swaps: u64,
    pub last: EngineSnapshot,
    pub cache: CacheStats,
    pub failed_frames: Vec<FrameIndex>,
    pub unknown_sections: Vec<String>,
    pub elapsed: Duration,
}

/// Outcome of `check`
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub scene: String,
    pub total_frames: usize,
    pub missing: Vec<PathBuf>,
}

/// Dispatch a parsed command line
pub fn run_app(args: Args) -> Result<()> {
    let path_config = PathConfig::from_env_and_cli(args.config_dir.clone());
    trace!("Command-line args: {:?}", args);

    match args.command {
        Command::Run(run) => {
            let summary = run_scene(&run, &path_config)?;
            print_summary(&summary);
        }
        Command::Check(scene) => {
            let report = check_scene(&scene, &path_config)?;
            println!(
                "Scene '{}': {} frames, {} missing",
                report.scene,
                report.total_frames,
                report.missing.len()
            );
            for path in report.missing.iter().take(20) {
                println!("  missing: {}", path.display());
            }
            if report.missing.len() > 20 {
                println!("  ... and {} more", report.missing.len() - 20);
            }
            if !report.missing.is_empty() {
                bail!("{} frame files missing", report.missing.len());
            }
        }
        Command::Pointcloud(pc) => {
            let (out, points) = export_point_cloud(&pc)?;
            println!("Wrote {} points to {}", points, out.display());
        }
    }
    Ok(())
}

/// Pick the scene: --preset, --scene, or scene.json in the config directory
pub fn resolve_scene(args: &SceneArgs, paths: &PathConfig) -> Result<SceneConfig> {
    let mut scene = if let Some(name) = &args.preset {
        SceneConfig::preset(name)?
    } else {
        let file = args
            .scene
            .clone()
            .unwrap_or_else(|| config::config_file(config::SCENE_FILE, paths));
        if !file.exists() {
            bail!(
                "No scene file at {} (use --scene FILE or --preset {})",
                file.display(),
                config::PRESETS.join("|")
            );
        }
        SceneConfig::from_json_file(&file).with_context(|| format!("Failed to load scene {}", file.display()))?
    };

    if let Some(dir) = &args.frames_dir {
        scene.frames.dir = dir.clone();
    }
    info!("Scene '{}': {} frames in {}", scene.name, scene.total_frames, scene.frames.dir.display());
    Ok(scene)
}

fn apply_intent(engine: &mut ScrubEngine<ImageLoader, LogSurface>, intent: &Intent) {
    debug!("Scripted intent: {:?}", intent);
    match intent {
        Intent::Start => engine.start(),
        Intent::Middle => engine.middle(),
        Intent::End => engine.end(),
        Intent::Play => engine.play(),
        Intent::Stop => engine.stop(),
        Intent::ZoomIn => engine.zoom_in(),
        Intent::ZoomOut => engine.zoom_out(),
        Intent::GoTo(name) => engine.go_to(name),
        Intent::Drag(dx) => {
            engine.handle_gesture(PointerEvent::Down { x: 0.0 });
            engine.handle_gesture(PointerEvent::Move { x: *dx });
            engine.handle_gesture(PointerEvent::Up);
        }
        Intent::Wheel(delta_y) => {
            engine.handle_gesture(PointerEvent::Wheel { delta_y: *delta_y });
        }
    }
}

/// Sleep between ticks, `None` for an unthrottled run (`fps <= 0`)
fn tick_period(fps: f64) -> Result<Option<Duration>> {
    if fps.is_nan() || fps <= 0.0 {
        return Ok(None);
    }
    Duration::try_from_secs_f64(1.0 / fps)
        .map(Some)
        .with_context(|| format!("--fps {} gives an unusable tick period", fps))
}

/// Run the engine for `args.ticks` ticks at `args.fps`
pub fn run_scene(args: &RunArgs, paths: &PathConfig) -> Result<RunSummary> {
    let scene = resolve_scene(&args.scene, paths)?;

    let executor: Arc<dyn LoadExecutor> = if args.sync_load {
        Arc::new(InlineExecutor)
    } else {
        let threads = args
            .workers
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1))
            .max(1);
        Arc::new(Workers::new(threads))
    };

    let mut engine = ScrubEngine::new(&scene, ImageLoader, executor, LogSurface::default())
        .context("Failed to start engine")?;

    let mut script: Vec<&ScriptedIntent> = args.at.iter().collect();
    script.sort_by_key(|s| s.tick);
    let mut script = script.into_iter().peekable();

    let period = tick_period(args.fps)?;
    let started = Instant::now();
    let mut next_deadline = started;

    let mut faults = 0u64;
    let mut failed_frames = Vec::new();
    let mut unknown_sections = Vec::new();

    for tick in 0..args.ticks {
        while let Some(step) = script.next_if(|s| s.tick <= tick) {
            apply_intent(&mut engine, &step.intent);
        }

        if engine.tick() == TickOutcome::Faulted {
            faults += 1;
        }

        for event in engine.events().poll() {
            if let Some(e) = downcast_event::<ResourceFailed>(&event) {
                failed_frames.push(e.index);
            } else if let Some(e) = downcast_event::<UnknownSection>(&event) {
                warn!("Unknown section '{}'", e.name);
                unknown_sections.push(e.name.clone());
            } else if let Some(e) = downcast_event::<TickFault>(&event) {
                debug!("Fault at tick {}: {}", e.tick, e.error);
            }
        }

        if let Some(period) = period {
            next_deadline += period;
            let now = Instant::now();
            if next_deadline > now {
                std::thread::sleep(next_deadline - now);
            } else {
                // Behind schedule: don't try to catch up
                next_deadline = now;
            }
        }
    }

    for step in script {
        warn!("Intent at tick {} never ran ({} ticks)", step.tick, args.ticks);
    }

    let last = engine.snapshot();
    let cache = engine.cache_stats();
    let swaps = engine.surface().swaps;
    let ticks = engine.ticks();
    engine.teardown();
    failed_frames.sort_unstable();

    Ok(RunSummary {
        scene: scene.name,
        ticks,
        faults,
        swaps,
        last,
        cache,
        failed_frames,
        unknown_sections,
        elapsed: started.elapsed(),
    })
}

fn print_summary(s: &RunSummary) {
    println!("Scene:     {}", s.scene);
    println!("Ticks:     {} in {:.2?} ({} faults)", s.ticks, s.elapsed, s.faults);
    println!(
        "Position:  frame {} (current {:.2}, target {:.2}), zoom {:.3}, {:?}",
        s.last.displayed_frame, s.last.current_frame, s.last.target_frame, s.last.current_zoom, s.last.playback
    );
    println!(
        "Cache:     {} ready, {} loading, {} failed, {} not requested ({} loads)",
        s.cache.ready, s.cache.loading, s.cache.failed, s.cache.not_requested, s.cache.loads_issued
    );
    println!("Swaps:     {}", s.swaps);
    if !s.failed_frames.is_empty() {
        println!("Failed:    {:?}", s.failed_frames);
    }
    if !s.unknown_sections.is_empty() {
        println!("Unknown:   {:?}", s.unknown_sections);
    }
}

/// Validate the scene and list frame files that do not exist
pub fn check_scene(args: &SceneArgs, paths: &PathConfig) -> Result<CheckReport> {
    let scene = resolve_scene(args, paths)?;
    scene.validate()?;
    let missing: Vec<PathBuf> = (0..scene.total_frames)
        .map(|i| scene.frames.path(i))
        .filter(|p| !p.exists())
        .collect();
    if !missing.is_empty() {
        warn!("{} of {} frames missing", missing.len(), scene.total_frames);
    }
    Ok(CheckReport {
        scene: scene.name,
        total_frames: scene.total_frames,
        missing,
    })
}

/// Decode the image, build the cloud, write PLY. Returns (output path, point count).
pub fn export_point_cloud(args: &PointCloudArgs) -> Result<(PathBuf, usize)> {
    let img = image::open(&args.image)
        .with_context(|| format!("Failed to open image {}", args.image.display()))?
        .to_rgba8();
    let params = PointCloudParams {
        skip: args.skip,
        depth_scale: args.depth_scale,
    };
    let cloud = image_to_point_cloud(&img, &params);

    let out = args.out.clone().unwrap_or_else(|| args.image.with_extension("ply"));
    let file = std::fs::File::create(&out).with_context(|| format!("Failed to create {}", out.display()))?;
    write_ply(&cloud, std::io::BufWriter::new(file)).with_context(|| format!("Failed to write {}", out.display()))?;
    info!("Point cloud: {} points -> {}", cloud.len(), out.display());
    Ok((out, cloud.len()))
}
