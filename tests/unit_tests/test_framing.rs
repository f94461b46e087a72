// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::Result;
use netconf_server_rs::{
    cfg::config::FramingConfig,
    transport::framing::{BaseVersion, FrameReader, FrameWriter, FramingError},
};

fn small_cfg(max_message: usize) -> FramingConfig {
    FramingConfig {
        max_message_bytes: max_message,
        max_header_line_bytes: 64,
        encode_chunk_bytes: 4096,
    }
}

async fn encode(version: BaseVersion, payload: &[u8], cfg: FramingConfig) -> Result<Vec<u8>> {
    let mut writer = FrameWriter::new(std::io::Cursor::new(Vec::new()), cfg);
    writer.set_version(version);
    writer.write_message(payload).await?;
    Ok(writer.into_inner().into_inner())
}

async fn decode_one(
    version: BaseVersion,
    wire: &[u8],
    cfg: FramingConfig,
) -> Result<Option<Vec<u8>>, FramingError> {
    let mut reader = FrameReader::new(wire, cfg);
    reader.set_version(version);
    Ok(reader.read_message().await?.map(|b| b.to_vec()))
}

#[tokio::test]
async fn eom_round_trip() -> Result<()> {
    let cfg = FramingConfig::default();
    let payload = b"<rpc message-id=\"1\"><get-config/></rpc>";
    let wire = encode(BaseVersion::V1_0, payload, cfg.clone()).await?;
    assert!(wire.ends_with(b"]]>]]>"));
    let decoded = decode_one(BaseVersion::V1_0, &wire, cfg).await?;
    assert_eq!(decoded.as_deref(), Some(payload.as_slice()));
    Ok(())
}

#[tokio::test]
async fn eom_rejects_payload_containing_sentinel() {
    let cfg = FramingConfig::default();
    let mut writer = FrameWriter::new(std::io::Cursor::new(Vec::new()), cfg);
    writer.set_version(BaseVersion::V1_0);
    let err = writer
        .write_message(b"abc]]>]]>def")
        .await
        .expect_err("sentinel payload must be rejected");
    assert!(matches!(err, FramingError::ContainsSentinel));
}

#[tokio::test]
async fn chunked_round_trip_multi_chunk() -> Result<()> {
    let mut cfg = FramingConfig::default();
    cfg.encode_chunk_bytes = 8;
    let payload: Vec<u8> = (0u8..=255).cycle().take(1000).collect();
    let wire = encode(BaseVersion::V1_1, &payload, cfg.clone()).await?;
    assert!(wire.ends_with(b"##\n"));
    let decoded = decode_one(BaseVersion::V1_1, &wire, cfg).await.expect("decode");
    assert_eq!(decoded.as_deref(), Some(payload.as_slice()));
    Ok(())
}

#[tokio::test]
async fn chunked_round_trip_empty_payload() -> Result<()> {
    let cfg = FramingConfig::default();
    let wire = encode(BaseVersion::V1_1, b"", cfg.clone()).await?;
    assert_eq!(wire, b"##\n");
    let decoded = decode_one(BaseVersion::V1_1, &wire, cfg).await.expect("decode");
    assert_eq!(decoded.as_deref(), Some(b"".as_slice()));
    Ok(())
}

#[tokio::test]
async fn chunked_payload_may_contain_sentinel() -> Result<()> {
    let cfg = FramingConfig::default();
    let payload = b"abc]]>]]>def";
    let wire = encode(BaseVersion::V1_1, payload, cfg.clone()).await?;
    let decoded = decode_one(BaseVersion::V1_1, &wire, cfg).await.expect("decode");
    assert_eq!(decoded.as_deref(), Some(payload.as_slice()));
    Ok(())
}

#[tokio::test]
async fn chunked_rejects_zero_and_leading_zero_lengths() {
    let cfg = FramingConfig::default();
    for wire in [b"#0\nx##\n".as_slice(), b"#007\nabcdefg##\n".as_slice()] {
        let err = decode_one(BaseVersion::V1_1, wire, cfg.clone())
            .await
            .expect_err("bad chunk length must be rejected");
        assert!(matches!(err, FramingError::BadHeader(_)), "got {err:?}");
    }
}

#[tokio::test]
async fn chunked_rejects_oversized_header_line() {
    let cfg = FramingConfig::default();
    let mut wire = Vec::from(&b"#"[..]);
    wire.extend(std::iter::repeat_n(b'9', 100));
    // No newline within the 64-byte cap.
    let err = decode_one(BaseVersion::V1_1, &wire, cfg)
        .await
        .expect_err("oversized header must be rejected");
    assert!(matches!(err, FramingError::HeaderOverflow { .. }), "got {err:?}");
}

#[tokio::test]
async fn chunked_rejects_per_chunk_overflow() {
    let cfg = small_cfg(16);
    let wire = b"#32\naaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa##\n";
    let err = decode_one(BaseVersion::V1_1, wire, cfg)
        .await
        .expect_err("oversized chunk must be rejected");
    assert!(matches!(err, FramingError::ChunkOverflow { .. }), "got {err:?}");
}

#[tokio::test]
async fn chunked_rejects_cumulative_overflow() {
    // Each chunk fits the cap; their sum does not.
    let cfg = small_cfg(16);
    let wire = b"#10\naaaaaaaaaa#10\nbbbbbbbbbb##\n";
    let err = decode_one(BaseVersion::V1_1, wire, cfg)
        .await
        .expect_err("cumulative overflow must be rejected");
    assert!(matches!(err, FramingError::MessageOverflow { .. }), "got {err:?}");
}

#[tokio::test]
async fn chunked_short_read_mid_chunk() {
    let cfg = FramingConfig::default();
    let wire = b"#10\nabc";
    let err = decode_one(BaseVersion::V1_1, wire, cfg)
        .await
        .expect_err("truncated chunk must be rejected");
    assert!(matches!(err, FramingError::ShortRead), "got {err:?}");
}

#[tokio::test]
async fn eom_short_read_mid_message() {
    let cfg = FramingConfig::default();
    let err = decode_one(BaseVersion::V1_0, b"<rpc>no terminator", cfg)
        .await
        .expect_err("unterminated message must be rejected");
    assert!(matches!(err, FramingError::ShortRead), "got {err:?}");
}

#[tokio::test]
async fn clean_eof_returns_none_in_both_modes() -> Result<()> {
    let cfg = FramingConfig::default();
    assert_eq!(decode_one(BaseVersion::V1_0, b"", cfg.clone()).await.expect("eof"), None);
    assert_eq!(decode_one(BaseVersion::V1_1, b"", cfg).await.expect("eof"), None);
    Ok(())
}

#[tokio::test]
async fn version_switch_keeps_buffered_bytes() -> Result<()> {
    // A hello in EOM framing followed immediately by a chunked message,
    // all visible to the reader in one stream: the switch must not drop
    // the chunked bytes that were buffered past the hello.
    let cfg = FramingConfig::default();
    let mut wire = Vec::new();
    wire.extend_from_slice(b"<hello/>]]>]]>");
    wire.extend_from_slice(b"#5\nworld##\n");

    let mut reader = FrameReader::new(wire.as_slice(), cfg);
    let hello = reader.read_message().await.expect("hello").expect("some");
    assert_eq!(&hello[..], b"<hello/>");

    reader.set_version(BaseVersion::V1_1);
    let msg = reader.read_message().await.expect("chunked").expect("some");
    assert_eq!(&msg[..], b"world");
    Ok(())
}

#[tokio::test]
async fn multiple_messages_on_one_stream() -> Result<()> {
    let cfg = FramingConfig::default();
    let wire = b"first]]>]]>second]]>]]>";
    let mut reader = FrameReader::new(wire.as_slice(), cfg);
    let a = reader.read_message().await.expect("a").expect("some");
    let b = reader.read_message().await.expect("b").expect("some");
    assert_eq!(&a[..], b"first");
    assert_eq!(&b[..], b"second");
    assert_eq!(reader.read_message().await.expect("eof"), None);
    Ok(())
}
