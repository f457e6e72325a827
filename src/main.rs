use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser, ValueEnum};
use prompt_pipelines::logging::init_logging;
use prompt_pipelines::pipelines::utils::DeviceRequest;
use prompt_pipelines::{InferenceService, ServiceConfig, Task};

/// Answer one prompt with a Hugging Face hub model.
///
/// Requires the HUGGINGFACE_API_KEY environment variable.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"Examples:
    prompt-pipelines "Once upon a time"
    prompt-pipelines --max-length 40 --temperature 0.7 "The city at night"
    prompt-pipelines --task classification "I loved every minute of it"
    prompt-pipelines --task classification --model clapAI/modernBERT-large-multilingual-sentiment "Meh""#)]
struct Cli {
    /// Text to continue or classify
    #[arg(allow_hyphen_values = true)]
    prompt: Option<String>,

    /// What to do with the prompt
    #[arg(long, value_enum, default_value_t = TaskArg::Generation)]
    task: TaskArg,

    /// Total token cap (generation) or truncation length (classification) [default: 100 / 512]
    #[arg(long)]
    max_length: Option<usize>,

    /// Model repository id
    #[arg(short, long)]
    model: Option<String>,

    /// GGUF weights file inside the model repository (generation)
    #[arg(long)]
    weights: Option<String>,

    /// Repository holding tokenizer.json and generation_config.json (generation)
    #[arg(long)]
    tokenizer_repo: Option<String>,

    /// Sampling temperature, 0 for greedy decoding
    #[arg(long)]
    temperature: Option<f64>,

    /// Sample only from the k most likely tokens
    #[arg(long)]
    top_k: Option<usize>,

    /// Nucleus sampling threshold
    #[arg(long)]
    top_p: Option<f64>,

    /// Random seed for reproducible sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Forbid repeating any n-gram of this size, 0 to disable
    #[arg(long)]
    no_repeat_ngram_size: Option<usize>,

    /// Run on this CUDA device
    #[arg(long, value_name = "INDEX")]
    cuda: Option<usize>,

    /// Hub cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TaskArg {
    Generation,
    Classification,
}

impl From<TaskArg> for Task {
    fn from(arg: TaskArg) -> Self {
        match arg {
            TaskArg::Generation => Task::Generation,
            TaskArg::Classification => Task::Classification,
        }
    }
}

impl Cli {
    fn service_config(&self) -> ServiceConfig {
        let mut config = ServiceConfig::new(self.task.into());

        if let Some(model) = &self.model {
            match config.task {
                Task::Generation => config.generation.repo.clone_from(model),
                Task::Classification => config.classification.repo.clone_from(model),
            }
        }
        if let Some(weights) = &self.weights {
            config.generation.weights_file.clone_from(weights);
        }
        if let Some(repo) = &self.tokenizer_repo {
            config.generation.tokenizer_repo.clone_from(repo);
        }

        config.overrides.temperature = self.temperature;
        config.overrides.top_k = self.top_k;
        config.overrides.top_p = self.top_p;
        config.overrides.seed = self.seed;
        config.overrides.no_repeat_ngram_size = self.no_repeat_ngram_size;

        if let Some(index) = self.cuda {
            config.device = DeviceRequest::Cuda(index);
        }
        config.cache_dir.clone_from(&self.cache_dir);
        config
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(prompt) = cli.prompt.as_deref() else {
        eprintln!("{}", Cli::command().render_usage());
        eprintln!("For more information, try '--help'.");
        process::exit(1);
    };

    init_logging(cli.verbose);

    let service = InferenceService::new(cli.service_config())?;
    let max_length = cli
        .max_length
        .unwrap_or_else(|| service.default_max_length());

    println!("{}", service.generate_response(prompt, max_length));
    Ok(())
}
