use std::env;

use anyhow::{Context, Result, bail};
use log::info;
use machine_learning::{
    dataset::{
        Cifar10, DatasetProvider,
        preprocessing::{count_classes, preprocess},
    },
    training::{History, TrainerBuilder},
};

use config::RunConfig;

mod config;

const CONFIG_VAR: &str = "TRAINER_CONFIG";

fn config_path() -> Result<String> {
    if let Some(path) = env::args().nth(1) {
        return Ok(path);
    }

    match env::var(CONFIG_VAR) {
        Ok(path) => Ok(path),
        Err(_) => bail!("usage: trainer <config.json> (or set {CONFIG_VAR})"),
    }
}

/// Describes the epoch that reached the best validation accuracy, epochs counted from one.
fn best_validation_report(history: &History) -> Option<String> {
    let best = history.best_validation()?;
    let val = best.validation?;

    Some(format!(
        "Best validation: epoch {} - val_loss {:.4} - val_accuracy {:.2}%",
        best.epoch + 1,
        val.loss,
        val.accuracy * 100.
    ))
}

fn main() -> Result<()> {
    env_logger::init();

    let path = config_path()?;
    let config = RunConfig::load(&path)?;
    info!("loaded run configuration from {path}");

    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("cannot build the thread pool")?;
        info!("running on {threads} threads");
    }

    let provider = Cifar10::new(&config.dataset.path);
    let (mut train, mut test) = provider
        .load()
        .with_context(|| format!("cannot load CIFAR-10 from {}", config.dataset.path.display()))?;

    if let Some(limit) = config.dataset.train_limit {
        train.truncate(limit);
    }
    if let Some(limit) = config.dataset.test_limit {
        test.truncate(limit);
    }

    let classes = count_classes(test.labels.view());
    info!(
        "{} training and {} test images of {classes} classes",
        train.len(),
        test.len()
    );

    let train = preprocess(&train, classes)?;
    let test = preprocess(&test, classes)?;

    let spec = config.trainer_spec(classes);
    let mut trainer = TrainerBuilder::new()
        .build(&spec)
        .context("invalid model or training configuration")?;

    println!("{}", trainer.summary());

    let history = trainer.fit(train, &test)?;
    let evaluation = trainer.evaluate(&test)?;

    if let Some(line) = best_validation_report(&history) {
        println!("{line}");
    }
    println!("Accuracy: {:.2}%", evaluation.accuracy * 100.);
    Ok(())
}
