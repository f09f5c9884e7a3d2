//! End-to-end pipeline tests: JSON-lines records in, classified rows out

use perfilar::model::TensorCore;
use perfilar::output::{Column, Writer};
use perfilar::{Engine, KernelRecord, PerfilarError, Row};

fn lstm_marker(batch: u64, x: u64, h: u64) -> String {
    format!(
        r#"{{"mod":"LSTMCell","op":"forward","args":[{{"shape":[{batch},{x}],"dtype":"float16"}},{{"shape":[{batch},{h}],"dtype":"float16"}}]}}"#
    )
}

fn process(engine: &mut Engine, line: &str) -> perfilar::Result<Row> {
    engine.process(KernelRecord::from_json_line(line, 1)?)
}

/// One forward LSTM cell step launches three kernels: layer GEMM,
/// recurrent GEMM, pointwise gates. B=32, X=64, H=128.
#[test]
fn forward_cell_step_classifies_all_three_kernels() {
    let marker = lstm_marker(32, 64, 128);
    let mut engine = Engine::new();

    let mut rows = Vec::new();
    for (sub, name) in [
        (0, "volta_sgemm_128x128_nn"),
        (1, "volta_sgemm_128x128_nn"),
        (2, "elementwise_kernel_lstm_cell"),
    ] {
        let line = format!(
            r#"{{"seqId":[100],"name":"{name}","dir":"fprop","sub":{sub},"grid":"4,4,1",
                "marker":[{marker:?}],"mod":["LSTMCell"],"op":["forward"],"sil":2000}}"#
        );
        rows.push(process(&mut engine, &line).unwrap());
    }

    // Layer GEMM: M = 4*128 = 512, N = 32, K = 64.
    assert_eq!(rows[0].params.to_string(), "gemm=layer,M=512,N=32,K=64,fp16");
    assert_eq!(rows[0].flops, 2 * 512 * 32 * 64);
    assert_eq!(rows[0].tc, TensorCore::NotUsed);

    // Recurrent GEMM: M = 512, N = 32, K = 128.
    assert_eq!(rows[1].params.to_string(), "gemm=recur,M=512,N=32,K=128,fp16");
    assert_eq!(rows[1].flops, 2 * 512 * 32 * 128);

    // Pointwise gates: elems = 2*4*128*32 + 2*128*32 = 40960; fp16.
    assert_eq!(rows[2].flops, 0);
    assert_eq!(rows[2].bytes, 40960 * 2);
    assert_eq!(rows[2].tc, TensorCore::NotApplicable);
    assert_eq!(
        rows[2].params.to_string(),
        "cell=LSTMCell,X=64,H=128,B=32,fp16"
    );
}

#[test]
fn backward_kernels_inherit_forward_annotation() {
    let marker = lstm_marker(32, 64, 128);
    let mut engine = Engine::new();

    let fprop = format!(
        r#"{{"seqId":[7],"name":"volta_sgemm_128x128_nn","dir":"fprop","sub":0,
            "grid":"4,1,1","marker":[{marker:?}],"mod":["LSTMCell"],"op":["forward"],
            "layer":["decoder","cell0"],"trace":["train.py:88"]}}"#
    );
    process(&mut engine, &fprop).unwrap();

    // Recurrent dgrad: tile 128x64, grid 1,8,1 -> gemmM = 128 = H.
    let dgrad = r#"{"seqId":[7],"name":"volta_sgemm_128x64_nn","dir":"bprop","sub":0,
        "grid":"1,8,1","marker":[],"seqMarker":["LSTMCellBackward"],"mod":[],"op":[]}"#;
    let row = process(&mut engine, dgrad).unwrap();

    assert_eq!(row.module, "LSTMCell");
    assert_eq!(row.op, "forward");
    assert_eq!(row.layer, vec!["decoder", "cell0"]);
    assert_eq!(row.trace, vec!["train.py:88"]);
    // M=128, N=B=32, K=4*128=512.
    assert_eq!(row.params.to_string(), "gemm=recur,M=128,N=32,K=512,fp16");
    assert_eq!(row.flops, 2 * 128 * 32 * 512);
    assert_eq!(row.bytes, (128 * 512 + 512 * 32 + 128 * 32) * 2);
}

#[test]
fn backward_wgrad_with_tensor_cores() {
    let marker = lstm_marker(32, 64, 128);
    let mut engine = Engine::new();

    let fprop = format!(
        r#"{{"seqId":[9],"name":"k","dir":"fprop","sub":0,"grid":"1,1,1",
            "marker":[{marker:?}],"mod":["LSTMCell"],"op":["forward"]}}"#
    );
    process(&mut engine, &fprop).unwrap();

    // Weight gradient: gemmM = 128 = H, gemmN = 64*8 = 512 = 4*H.
    let wgrad = r#"{"seqId":[9],"name":"volta_fp16_s884gemm_fp16_128x64_ldg8_f2f_nt",
        "dir":"bprop","sub":1,"grid":"1,8,1","marker":[],
        "seqMarker":["LSTMCellBackward"],"mod":[],"op":[]}"#;
    let row = process(&mut engine, wgrad).unwrap();

    assert_eq!(row.params.to_string(), "gemm=recur,M=128,N=512,K=32,fp16");
    assert_eq!(row.tc, TensorCore::Used);
    assert_eq!(row.flops, 2 * 128 * 512 * 32);
}

#[test]
fn alternate_seq_id_links_when_primary_misses() {
    let marker = lstm_marker(4, 10, 20);
    let mut engine = Engine::new();

    // Forward record carries 55 only in altSeqId.
    let fprop = format!(
        r#"{{"seqId":[3],"altSeqId":[55],"name":"k","dir":"fprop","sub":2,
            "grid":"1,1,1","marker":[{marker:?}],"mod":["LSTMCell"],"op":["forward"]}}"#
    );
    process(&mut engine, &fprop).unwrap();

    let bprop = r#"{"seqId":[55],"name":"bwd_elementwise","dir":"bprop","sub":2,
        "grid":"1,1,1","marker":[],"seqMarker":["bwd"],"mod":[],"op":[]}"#;
    let row = process(&mut engine, bprop).unwrap();
    assert_eq!(row.module, "LSTMCell");
}

#[test]
fn unlinked_backward_record_degrades_gracefully() {
    let mut engine = Engine::new();
    let bprop = r#"{"seqId":[404],"name":"volta_sgemm_128x64_nn","dir":"bprop","sub":0,
        "grid":"1,1,1","marker":[],"seqMarker":["bwd"],"mod":[],"op":[]}"#;
    let row = process(&mut engine, bprop).unwrap();

    assert_eq!(row.flops, 0);
    assert_eq!(row.bytes, 0);
    assert_eq!(row.tc, TensorCore::NotApplicable);
    assert_eq!(row.module, "");
    assert!(row.params.is_empty());
}

#[test]
fn records_without_annotations_pass_through() {
    let mut engine = Engine::new();
    let line = r#"{"name":"cudnn::detail::bn_fw_tr","dir":"fprop","sub":0,
        "marker":["some nvtx range"],"mod":["BatchNorm2d"],"op":["batch_norm"]}"#;
    let row = process(&mut engine, line).unwrap();
    assert_eq!(row.module, "BatchNorm2d");
    assert_eq!(row.op, "batch_norm");
    assert_eq!(row.flops, 0);
}

#[test]
fn malformed_annotation_aborts_the_run() {
    let mut engine = Engine::new();
    // Passes the recognition predicate, fails structural validation.
    let line = r#"{"name":"k","dir":"fprop","sub":0,
        "marker":["{\"mod\":\"LSTMCell\",\"op\":\"forward\",\"args\":[{\"shape\":[4],\"dtype\":\"tachyon\"}]}"],
        "mod":["LSTMCell"],"op":["forward"]}"#;
    let result = process(&mut engine, line);
    assert!(matches!(result, Err(PerfilarError::UnknownDtype(_))));
}

#[test]
fn csv_report_end_to_end() {
    let marker = lstm_marker(4, 10, 20);
    let mut engine = Engine::new();
    let line = format!(
        r#"{{"seqId":[1],"name":"volta_sgemm_128x64_nn","dir":"fprop","sub":0,
            "grid":"1,1,1","sil":1500,"marker":[{marker:?}],
            "mod":["LSTMCell"],"op":["forward"]}}"#
    );
    let row = process(&mut engine, &line).unwrap();

    let writer = Writer::new(
        vec![
            Column::Idx,
            Column::Mod,
            Column::Op,
            Column::Params,
            Column::Tc,
            Column::Flops,
            Column::Bytes,
        ],
        true,
        0,
    )
    .unwrap();
    let mut out = Vec::new();
    writer.header(&mut out).unwrap();
    writer.row(&mut out, &row).unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "\"Idx\",\"Module\",\"Op\",\"Params\",\"TC\",\"FLOPs\",\"Bytes\""
    );
    assert_eq!(
        lines[1],
        "\"1\",\"LSTMCell\",\"forward\",\"gemm=layer,M=80,N=4,K=10,fp16\",\"0\",\"6400\",\"2320\""
    );
}
