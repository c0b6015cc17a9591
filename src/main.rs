use anyhow::{Context, Result};
use burn::backend::NdArray;
use burn::prelude::*;
use mlstmfcn::cli::{parse_args, preset, setup_logging, CheckArgs, Commands, DescribeArgs, InitConfigArgs};
use mlstmfcn::model::classifier::ClassifierConfig;
use mlstmfcn::model::InputShape;
use mlstmfcn::network::{describe, DeepNetwork, MlstmFcnNetwork};
use mlstmfcn::runtime::{self, DeviceKind};
use mlstmfcn::utils::{self, format_number, random::random_batch};
use tracing::{error, info, warn};

type Cpu = NdArray<f32>;

fn main() {
    let cli = parse_args();

    setup_logging(cli.verbose);

    info!("{}", mlstmfcn::info());

    let result = match cli.command {
        Commands::Describe(args) => run_describe(args),
        Commands::InitConfig(args) => run_init_config(args),
        Commands::Check(args) => run_check(args),
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run_describe(args: DescribeArgs) -> Result<()> {
    let config = args.network.resolve().context("Invalid network configuration")?;
    let shape = InputShape::new(args.timesteps, args.channels);

    let network = MlstmFcnNetwork::new(config);
    let topology = describe(&network, shape).context("Failed to build topology")?;

    let rendered = match args.format.as_str() {
        "table" => topology.summary().render(),
        "json" => serde_json::to_string_pretty(&topology)?,
        _ => anyhow::bail!("Unsupported output format: {}", args.format),
    };

    match args.output {
        Some(path) => {
            utils::ensure_parent_dir(&path)?;
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {:?}", path))?;
            info!("Topology written to: {:?}", path);
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

fn run_init_config(args: InitConfigArgs) -> Result<()> {
    let config = preset(&args.preset)
        .with_context(|| format!("Unknown preset: {} (expected default, karim, small)", args.preset))?;

    utils::ensure_parent_dir(&args.output)?;
    config
        .save(&args.output)
        .with_context(|| format!("Failed to write configuration to {:?}", args.output))?;

    info!("Configuration ({} preset) saved to: {:?}", args.preset, args.output);
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<()> {
    args.validate().context("Invalid check arguments")?;

    let requested: DeviceKind = args.device.parse().map_err(anyhow::Error::msg)?;
    let capability = runtime::probe(requested);
    if !capability.available {
        warn!("Backend check failed; results may be unreliable");
    }

    let config = args.network.resolve().context("Invalid network configuration")?;
    let shape = InputShape::new(args.timesteps, args.channels);
    let device = <Cpu as Backend>::Device::default();
    let input = random_batch::<Cpu>(
        args.batch_size,
        args.timesteps,
        args.channels,
        config.random_state,
        &device,
    );

    info!(
        "Checking network on {} (batch {}, input {:?})",
        capability.active,
        args.batch_size,
        (args.timesteps, args.channels)
    );

    if args.n_classes == 0 {
        let builder = MlstmFcnNetwork::new(config);
        let network = builder
            .init::<Cpu>(shape, &device)
            .context("Failed to initialise network")?;

        let output = network.forward(input);
        info!("Feature output shape: {:?}", output.dims());
        info!("Parameters: {}", format_number(network.num_params()));
    } else {
        let classifier = ClassifierConfig::new(config)
            .with_n_classes(args.n_classes)
            .init::<Cpu>(shape, &device)
            .context("Failed to initialise classifier")?;

        let output = classifier.predict(input);
        info!("Probability shape: {:?}", output.probabilities.dims());
        info!("Predicted classes: {}", output.predictions);
        info!("Feature width: {}", classifier.network().output_width());
        info!("Parameters: {}", format_number(classifier.num_params()));
    }

    Ok(())
}
