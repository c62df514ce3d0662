//! Property-based tests using proptest

use lz65::*;
use proptest::prelude::*;

// Small alphabets produce runs and back-references, full bytes mostly literals
fn source_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..=MAX_INPUT_LEN),
        prop::collection::vec(0u8..4, 0..=MAX_INPUT_LEN),
        prop::collection::vec(prop::sample::select(vec![0u8, 0xff]), 0..=MAX_INPUT_LEN),
    ]
}

proptest! {
    #[test]
    fn test_round_trip(src in source_strategy()) {
        let compressed = compress_to_vec(&src).unwrap();
        prop_assert!(compressed.len() <= max_compressed_len(src.len()));
        prop_assert_eq!(decompress_to_vec(&compressed).unwrap(), src);
    }

    #[test]
    fn test_token_invariants(src in source_strategy()) {
        let tokens = encode_tokens(&src).unwrap();
        let (eos, body) = tokens.split_last().unwrap();
        prop_assert_eq!(*eos, Token::EOS);

        let mut cursor = 0;
        for token in body {
            prop_assert_ne!(token.command(), Command::Eos);
            prop_assert!(token.length() >= 1);
            match token.command() {
                Command::Rep => {
                    prop_assert!(token.position() < cursor);
                    prop_assert!(token.length() <= MAX_TOKEN_LEN);
                }
                Command::Rle => prop_assert!(token.length() <= MAX_TOKEN_LEN),
                _ => {}
            }
            cursor += token.length();
        }
        prop_assert_eq!(cursor, src.len());
    }

    #[test]
    fn test_parsed_stream_ends_with_eos(src in source_strategy()) {
        let compressed = compress_to_vec(&src).unwrap();
        let tokens = parse_tokens(&compressed).unwrap();
        let last = tokens.last().unwrap();
        prop_assert_eq!(last.command(), Command::Eos);
        prop_assert_eq!(last.position(), compressed.len() - 1);
        prop_assert_eq!(tokens.iter().filter(|t| t.command() == Command::Eos).count(), 1);
    }

    #[test]
    fn test_buf_matches_vec(src in source_strategy()) {
        let expected = compress_to_vec(&src).unwrap();
        let mut out = [0u8; max_compressed_len(MAX_INPUT_LEN)];
        let len = compress_to_buf(&src, &mut out).unwrap();
        prop_assert_eq!(&out[..len], &expected[..]);
    }

    #[test]
    fn test_garbage_never_panics(inp in prop::collection::vec(any::<u8>(), 0..600)) {
        if let Ok(out) = decompress_to_vec(&inp) {
            prop_assert!(out.len() <= MAX_INPUT_LEN);
        }
    }
}
