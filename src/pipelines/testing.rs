//! Fixtures shared by unit tests.

use tokenizers::Tokenizer;

const WORD_TOKENIZER: &str = r#"{
  "version": "1.0",
  "truncation": null,
  "padding": null,
  "added_tokens": [
    {"id": 0, "content": "<eos>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
    {"id": 5, "content": "[PAD]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
  ],
  "normalizer": null,
  "pre_tokenizer": {"type": "Whitespace"},
  "post_processor": null,
  "decoder": null,
  "model": {
    "type": "WordLevel",
    "vocab": {"<eos>": 0, "[UNK]": 1, "hello": 2, "world": 3, "again": 4, "[PAD]": 5},
    "unk_token": "[UNK]"
  }
}"#;

/// Whitespace word-level tokenizer: `<eos>`=0, `[UNK]`=1, hello=2, world=3, again=4, `[PAD]`=5.
pub(crate) fn word_tokenizer() -> Tokenizer {
    Tokenizer::from_bytes(WORD_TOKENIZER.as_bytes()).expect("valid tokenizer json")
}

#[test]
fn word_tokenizer_round_trips_known_words() {
    let tokenizer = word_tokenizer();
    let encoding = tokenizer.encode("hello world again", false).unwrap();
    assert_eq!(encoding.get_ids(), &[2, 3, 4]);
    assert_eq!(tokenizer.decode(&[2, 0, 3], true).unwrap(), "hello world");
}
