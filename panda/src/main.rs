use clap::{Parser, Subcommand};
use log::info;
use panda::run_lioness::*;
use panda::run_panda::*;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "PANDA",
    long_about = "Passing Attributes between Networks for Data Assimilation\n\
		  Infer a TF x gene regulatory network by message passing\n\
		  between a motif prior, protein-protein interactions\n\
		  and gene co-expression."
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Infer a regulatory network",
        long_about = "Infer a regulatory network in the three stages: \n\
		      (1) Align genes and TFs of the expression, motif and PPI data\n\
		      (2) Normalize the co-expression, motif and PPI networks\n\
		      (3) Pass messages between them until the motif network converges.\n\
		      Without a motif prior, the co-expression network is the output."
    )]
    Run(RunArgs),

    #[command(
        about = "Infer sample-specific networks (LIONESS)",
        long_about = "Run PANDA on all the samples and again leaving out\n\
		      each sample; contrast the two to estimate\n\
		      a network for every sample.\n"
    )]
    Lioness(LionessArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Run(args) => {
            run_panda(args)?;
        }
        Commands::Lioness(args) => {
            run_lioness(args)?;
        }
    }

    info!("Done");
    Ok(())
}
