// Chunk-boundary invariance of the SSE framer: reassembling a byte stream
// split at arbitrary boundaries yields the same record sequence as feeding
// the whole stream at once.

use sluice::config::FramerConfig;
use sluice::framer::{FramedRecord, SseFramer};

fn drain_with_chunks(stream: &str, chunk_sizes: &[usize]) -> Vec<FramedRecord> {
    let mut framer = SseFramer::new(FramerConfig::default());
    let mut records = Vec::new();
    let mut rest = stream;
    let mut sizes = chunk_sizes.iter().cycle();

    while !rest.is_empty() {
        let mut take = (*sizes.next().unwrap()).min(rest.len()).max(1);
        while !rest.is_char_boundary(take) {
            take += 1;
        }
        let (chunk, tail) = rest.split_at(take);
        rest = tail;
        records.extend(framer.feed_chunk(chunk).into_iter().map(|r| r.unwrap()));
    }
    records.extend(framer.finish().into_iter().map(|r| r.unwrap()));
    records
}

fn realistic_stream() -> String {
    concat!(
        ": connected\n",
        "\n",
        "event: start\n",
        "data: {\"type\":\"start\",\"thread_id\":\"t1\"}\n",
        "\n",
        "data: {\"type\":\"custom_stream\",\"thread_id\":\"t1\",\"custom_llm_chunk\":\"Hello \"}\n",
        "\n",
        "data: {\"type\":\"custom_stream\",\"thread_id\":\"t1\",\"custom_llm_chunk\":\"wörld ␦\"}\n",
        "\n",
        "id: 9\n",
        "retry: 1500\n",
        "data: {\"type\":\"complete\",\"thread_id\":\"t1\"}\n",
        "\n",
        "data: [DONE]\n",
        "\n",
    )
    .to_string()
}

#[test]
fn whole_stream_equals_byte_by_byte() {
    let stream = realistic_stream();
    let whole = drain_with_chunks(&stream, &[stream.len()]);
    let tiny = drain_with_chunks(&stream, &[1]);
    assert_eq!(whole, tiny);
    assert_eq!(whole.len(), 5);
}

#[test]
fn assorted_chunk_sizes_agree() {
    let stream = realistic_stream();
    let reference = drain_with_chunks(&stream, &[stream.len()]);
    for sizes in [&[2usize, 3, 5][..], &[7][..], &[1, 64][..], &[13, 1, 1][..]] {
        assert_eq!(
            drain_with_chunks(&stream, sizes),
            reference,
            "chunk sizes {:?}",
            sizes
        );
    }
}

#[test]
fn split_inside_done_sentinel() {
    let stream = "data: [DO";
    let mut framer = SseFramer::new(FramerConfig::default());
    assert!(framer.feed_chunk(stream).is_empty());
    let mut records: Vec<_> = framer
        .feed_chunk("NE]\n\n")
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    records.extend(framer.finish().into_iter().map(|r| r.unwrap()));
    assert_eq!(records, vec![FramedRecord::stream_done()]);
}

#[test]
fn multi_line_data_survives_splitting() {
    let stream = "data: first\ndata: second\ndata: third\n\n";
    let reference = drain_with_chunks(stream, &[stream.len()]);
    assert_eq!(reference[0].data, "first\nsecond\nthird");
    assert_eq!(drain_with_chunks(stream, &[4]), reference);
}

#[test]
fn oversized_record_error_does_not_poison_later_records() {
    let mut framer = SseFramer::new(FramerConfig {
        max_event_size: 16,
        ..Default::default()
    });
    let body = format!("data: {}\n\ndata: fine\n\n", "x".repeat(64));
    let results = framer.feed_chunk(&body);

    assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    let survivors: Vec<_> = results.into_iter().filter_map(|r| r.ok()).collect();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].data, "fine");
}
