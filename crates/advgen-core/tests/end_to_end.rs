use std::io::Write;
use std::path::{Path, PathBuf};

use advgen_core::rng::SplitMix64;
use advgen_core::{
    perturb, pipeline, ActionInstance, CorpusFormat, GeneratorConfig, StaticGrounder, Vocabulary,
    MASK_MODIFIED,
};

fn strings(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

#[test]
fn full_rate_perturbation_scenario() {
    // Two observations, three valid actions, 100% rate: every position
    // must be replaced by a pool draw.
    let trace = strings(&["fly p1 c1 c2", "board p1 a1"]);
    let pool = strings(&["fly p1 c1 c2", "board p1 a1", "debark p1 a1"]);

    let mut rng = SplitMix64::new(42);
    let result = perturb(&trace, 100.0, &pool, &mut rng).unwrap();

    assert_eq!(result.mask, vec![MASK_MODIFIED, MASK_MODIFIED]);
    assert_eq!(result.substitutions, 2);
    for token in &result.observations {
        assert!(pool.iter().any(|p| p.to_uppercase() == *token));
    }

    // The replaced trace still encodes against a pool-derived vocabulary.
    let vocab = Vocabulary::build(pool.clone());
    let encoded = vocab.encode_observations(&result.observations).unwrap();
    assert_eq!(vocab.decode(&encoded).unwrap(), result.observations);
}

fn write_item_zip(dir: &Path, name: &str) -> PathBuf {
    let template = "(define (problem p)\n(:objects p1 a1 c1 c2)\n(:init\n\t(at p1 c1)\n\t(in a1 p1)\n)\n(:goal (and\n<HYPOTHESIS>\n))\n)";
    let files: Vec<(&str, String)> = vec![
        ("obs.dat", "(fly p1 c1 c2)\n(board p1 a1)\n".to_string()),
        ("hyps.dat", "(at p1 c2), (in a1 p1)\n(at p1 c1)\n".to_string()),
        ("real_hyp.dat", "(at p1 c2), (in a1 p1)\n".to_string()),
        ("template.pddl", template.to_string()),
        ("domain.pddl", "(define (domain travel))".to_string()),
    ];

    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    for (entry, content) in files {
        writer.start_file(entry, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    path
}

#[tokio::test]
async fn corpus_to_records_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = GeneratorConfig::default();
    config.domains = vec!["travel".to_string()];
    config.observability_levels = vec![100];
    config.attack_rates = vec![0, 100];
    config.format = CorpusFormat::Standard;
    config.resolve_paths(dir.path());

    let plans = config.plans_dir("travel", 100);
    std::fs::create_dir_all(&plans).unwrap();
    write_item_zip(&plans, "p01.zip");
    write_item_zip(&plans, "p02.zip");

    let grounder = StaticGrounder::new(vec![
        ActionInstance::new("fly", strings(&["p1", "c1", "c2"])),
        ActionInstance::new("board", strings(&["p1", "a1"])),
        ActionInstance::new("debark", strings(&["p1", "a1"])),
    ]);

    pipeline::build_vocabularies(&config, &grounder, "travel")
        .await
        .unwrap();

    let summary = pipeline::run(&config, &grounder).await;
    assert_eq!(summary.domains_ok, 1);
    assert_eq!(summary.cells, 2);
    assert_eq!(summary.items_ok, 4);
    assert_eq!(summary.items_failed, 0);

    let out_dir = config.cell_output_dir("travel", 100);

    // Rate 0 leaves every position original.
    let untouched: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out_dir.join("0_mask.json")).unwrap())
            .unwrap();
    assert_eq!(untouched["p01.zip"]["mask"], serde_json::json!([0, 0]));

    // Rate 100 replaces every position.
    let attacked: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out_dir.join("100_mask.json")).unwrap())
            .unwrap();
    assert_eq!(attacked["p02.zip"]["mask"], serde_json::json!([1, 1]));

    let analysis: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(out_dir.join("atk_analysis.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(analysis["0"]["actual_atk_perc"], serde_json::json!(0.0));
    assert_eq!(analysis["100"]["2"], serde_json::json!(2));
}
