use anyhow::{Context, ensure};
use clap::{Parser, Subcommand};
use prism_common::{Extent2d, SandboxConfig};
use prism_gpu::headless::{Headless, HeadlessAdapter, HeadlessSurface};
use prism_gpu::{Adapter, ContextDesc, GraphicsContext, PresentMode, QueueKind};
use prism_render::{FlyCamera, Renderer, ShaderBlobs};
use prism_render_wgpu::{builtin_shaders, enumerate_adapters};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prism-cli", about = "Headless tools for the prism renderer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON sandbox configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the GPU adapters wgpu can see
    Info,
    /// Render frames on the simulated GPU and report frame pacing
    Run {
        /// Number of frames to render
        #[arg(short, long, default_value = "8")]
        frames: u64,
        /// Back buffer count; defaults to the config value
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(2..=16))]
        buffers: Option<u32>,
        /// Frames the simulated direct queue may trail the CPU by
        #[arg(short, long, default_value = "0")]
        lag: usize,
        /// Back buffer order after each present, e.g. 0,2,1
        #[arg(long, value_delimiter = ',')]
        present_order: Option<Vec<u32>>,
        /// Read shaders from this directory instead of the built-in ones
        #[arg(long)]
        shader_dir: Option<PathBuf>,
    },
}

struct RunOptions {
    frames: u64,
    buffers: u32,
    lag: usize,
    present_order: Option<Vec<u32>>,
    shaders: ShaderBlobs,
}

fn run(config: &SandboxConfig, options: RunOptions) -> anyhow::Result<()> {
    if let Some(order) = &options.present_order {
        ensure!(!order.is_empty(), "present order is empty");
        ensure!(
            order.iter().all(|&index| index < options.buffers),
            "present order {order:?} names a buffer outside 0..{}",
            options.buffers
        );
    }

    let mut adapter =
        HeadlessAdapter::new().with_completion_lag(QueueKind::Direct, options.lag);
    if let Some(order) = options.present_order {
        adapter = adapter.with_flip_order(order);
    }
    let info = adapter.info();
    println!("adapter: {} ({})", info.name, info.backend);

    let extent = Extent2d::new(config.width, config.height);
    let ctx = GraphicsContext::<Headless>::new(
        &adapter,
        &HeadlessSurface { extent },
        &ContextDesc {
            extent,
            buffer_count: options.buffers,
            present_mode: if config.vsync {
                PresentMode::Vsync
            } else {
                PresentMode::Immediate
            },
            ..ContextDesc::default()
        },
    )?;
    let mut renderer = Renderer::new(ctx, &options.shaders, config.clear_color)?;
    let camera = FlyCamera::default();

    println!(
        "rendering {} frames into {} buffers, direct queue lag {}",
        options.frames, options.buffers, options.lag
    );
    for _ in 0..options.frames {
        renderer.render(&camera)?;
        let outcome = renderer.present()?;
        println!(
            "frame {:>4}: presented {} -> next {} (fence {:>4}) {}",
            outcome.frame,
            outcome.previous_back_buffer,
            outcome.back_buffer,
            outcome.waited_for,
            if outcome.blocked { "STALL" } else { "ready" }
        );
    }

    let ctx = renderer.context();
    let sync = ctx.frame_sync().stats();
    let sim = ctx.device().stats();
    println!(
        "presented {} frames, {} cpu stalls, {} forced waits, {} lists completed of {}",
        sync.frames_presented, sync.cpu_stalls, sim.forced_waits, sim.lists_completed, sim.lists_submitted
    );

    let messages = ctx.device().validation_messages();
    for message in &messages {
        println!("validation: {message}");
    }
    ensure!(messages.is_empty(), "{} validation errors", messages.len());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => SandboxConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => SandboxConfig::default(),
    };

    match cli.command {
        Commands::Info => {
            println!("prism-cli v{}", env!("CARGO_PKG_VERSION"));
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
            let adapters = enumerate_adapters(&instance);
            if adapters.is_empty() {
                println!("no GPU adapters found");
            }
            for adapter in adapters {
                println!("adapter: {} ({})", adapter.name, adapter.backend);
            }
        }
        Commands::Run {
            frames,
            buffers,
            lag,
            present_order,
            shader_dir,
        } => {
            let shaders = match shader_dir {
                Some(dir) => ShaderBlobs::load(dir)?,
                None => builtin_shaders(),
            };
            run(
                &config,
                RunOptions {
                    frames,
                    buffers: buffers.unwrap_or(config.buffer_count),
                    lag,
                    present_order,
                    shaders,
                },
            )?;
        }
    }

    Ok(())
}
