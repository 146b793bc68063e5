use crate::lioness::{run_lioness as lioness_networks, LionessConfig, LionessOutput};
use crate::run_panda::PandaInputArgs;
use clap::Args;
use log::info;
use rayon::ThreadPoolBuilder;

#[derive(Args, Debug)]
pub struct LionessArgs {
    #[command(flatten)]
    pub input: PandaInputArgs,

    /// first sample (1-based)
    #[arg(long, default_value_t = 1)]
    pub start: usize,

    /// last sample (1-based, inclusive); the last one by default
    #[arg(long)]
    pub end: Option<usize>,

    /// what to keep of each sample-specific network
    #[arg(long, value_enum, default_value = "network")]
    pub output: LionessOutput,

    /// output directory
    #[arg(long, default_value = "lioness_output")]
    pub out_dir: Box<str>,

    /// also write each sample's network in the output directory
    #[arg(long, default_value_t = false)]
    pub save_single: bool,

    /// maximum number of threads
    #[arg(long, default_value_t = 16)]
    pub threads: usize,
}

pub fn run_lioness(args: &LionessArgs) -> anyhow::Result<()> {
    if args.input.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let max_threads = num_cpus::get().min(args.threads.max(1));

    ThreadPoolBuilder::new()
        .num_threads(max_threads)
        .build_global()?;

    info!("will use {} threads", rayon::current_num_threads());

    let config = args.input.to_config(true, true);
    let panda = args.input.run_panda(&config)?;

    let panda_file = format!("{}/panda.tsv.gz", args.out_dir);
    panda.network.to_file(&panda_file)?;

    let lioness_config = LionessConfig {
        start: args.start,
        end: args.end,
        output: args.output,
        save_dir: args.save_single.then(|| args.out_dir.clone()),
        show_progress: !args.input.verbose,
    };

    let networks = lioness_networks(&panda, &lioness_config)?;

    let lioness_file = format!("{}/lioness.tsv.gz", args.out_dir);
    networks.to_file(&lioness_file)?;

    info!("Done: {}, {}", panda_file, lioness_file);
    Ok(())
}
