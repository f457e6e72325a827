#![cfg(feature = "integration")]

// Downloads real models; needs HUGGINGFACE_API_KEY and network access.

use prompt_pipelines::{InferenceService, ServiceConfig, Task, APOLOGY};

#[test]
fn generation_continues_the_prompt() -> anyhow::Result<()> {
    let mut config = ServiceConfig::new(Task::Generation);
    config.overrides.seed = Some(42);
    let service = InferenceService::new(config)?;

    let response = service.generate_response("The weather today is", 40);
    assert_ne!(response, APOLOGY);
    assert!(!response.trim().is_empty());
    assert!(!response.contains("<|endoftext|>"));
    assert!(!response.contains("<|im_end|>"));
    Ok(())
}

#[test]
fn greedy_generation_is_reproducible() -> anyhow::Result<()> {
    let mut config = ServiceConfig::new(Task::Generation);
    config.overrides.temperature = Some(0.0);
    let service = InferenceService::new(config)?;

    let first = service.generate_response("Rust is a language that", 30);
    let second = service.generate_response("Rust is a language that", 30);
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn classification_reports_a_percentage() -> anyhow::Result<()> {
    let service = InferenceService::new(ServiceConfig::new(Task::Classification))?;

    let first = service.generate_response("I absolutely loved this movie!", 512);
    let percent: f32 = first
        .strip_prefix("Confidence: ")
        .and_then(|s| s.strip_suffix('%'))
        .ok_or_else(|| anyhow::anyhow!("unexpected response {first:?}"))?
        .parse()?;
    assert!((0.0..=100.0).contains(&percent));

    let second = service.generate_response("I absolutely loved this movie!", 512);
    assert_eq!(first, second);
    Ok(())
}
