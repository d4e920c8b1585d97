// File: tests/next_actions.rs
use chrono::NaiveDate;
use nextact::config::Config;
use nextact::store::{Document, NextActionStore, compute_next_actions};
use nextact::storage::MemorySource;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn texts(actions: &[nextact::store::NextAction]) -> Vec<&str> {
    actions.iter().map(|a| a.task_text.as_str()).collect()
}

#[test]
fn test_higher_priority_first_across_documents() {
    let docs = vec![
        Document::new("Errands.md", "#individualtasks\n- [ ] Post letter #p3"),
        Document::new("Urgent.md", "#individualtasks\n- [ ] Call plumber #p1"),
    ];
    let actions = compute_next_actions(&docs, &Config::default(), ymd(2024, 1, 1));
    assert_eq!(texts(&actions), vec!["Call plumber #p1", "Post letter #p3"]);
    assert_eq!(actions[0].priority, 1);
    assert_eq!(actions[1].priority, 3);
    assert!(actions.iter().all(|a| a.is_aggregate_view));
}

#[test]
fn test_project_shows_only_first_eligible_task() {
    let doc = "# Garden #projects\n\
               - [x] Buy seeds\n\
               - [ ] Dig beds @start(2024-04-01)\n\
               - [ ] Sharpen tools\n\
               - [ ] Plant beans";
    let docs = vec![Document::new("Garden.md", doc)];

    let march = compute_next_actions(&docs, &Config::default(), ymd(2024, 3, 1));
    assert_eq!(texts(&march), vec!["Sharpen tools"]);
    assert_eq!(march[0].line_index, 3);
    assert!(!march[0].is_aggregate_view);

    let april = compute_next_actions(&docs, &Config::default(), ymd(2024, 4, 1));
    assert_eq!(texts(&april), vec!["Dig beds @start(2024-04-01)"]);
}

#[test]
fn test_document_priority_is_the_fallback() {
    let docs = vec![
        Document::new("Taxes.md", "#projects #p2\n- [ ] Collect receipts"),
        Document::new("Reading.md", "#projects\n- [ ] Finish chapter"),
        Document::new("Move.md", "#projects #p5\n- [ ] Book van #p1"),
    ];
    let actions = compute_next_actions(&docs, &Config::default(), ymd(2024, 1, 1));
    let ranks: Vec<(&str, usize)> = actions
        .iter()
        .map(|a| (a.document.name(), a.priority))
        .collect();
    // Untagged documents land in the middle of the default seven tags.
    assert_eq!(ranks, vec![("Move", 1), ("Taxes", 2), ("Reading", 4)]);
}

#[test]
fn test_equal_ranks_keep_document_order() {
    let docs = vec![
        Document::new("B.md", "#individualtasks\n- [ ] b1\n- [ ] b2"),
        Document::new("A.md", "#individualtasks\n- [ ] a1"),
    ];
    let actions = compute_next_actions(&docs, &Config::default(), ymd(2024, 1, 1));
    assert_eq!(texts(&actions), vec!["b1", "b2", "a1"]);
}

#[test]
fn test_custom_tags_from_config() {
    let config = Config {
        project_tag: "#areas".to_string(),
        individual_task_tag: "Inbox".to_string(),
        priority_tags: Config::priority_tags_from_csv("now, soon, later"),
        ..Config::default()
    };
    let docs = vec![
        Document::new("Home.md", "#AREAS\n- [ ] Fix shelf later"),
        Document::new("Inbox.md", "#inbox\n- [ ] Reply to Sam now\n- [ ] File notes"),
        Document::new("Old.md", "#projects\n- [ ] Ignored"),
    ];
    let actions = compute_next_actions(&docs, &config, ymd(2024, 1, 1));
    let ranks: Vec<(&str, usize)> = actions
        .iter()
        .map(|a| (a.task_text.as_str(), a.priority))
        .collect();
    assert_eq!(
        ranks,
        vec![
            ("Reply to Sam now", 1),
            // The document mentions "now", so that is its fallback rank.
            ("File notes", 1),
            ("Fix shelf later", 3)
        ]
    );
}

#[test]
fn test_ranks_stay_within_tag_list() {
    let config = Config {
        priority_tags: vec!["p1".to_string(), "p2".to_string()],
        ..Config::default()
    };
    let docs = vec![Document::new(
        "Mixed.md",
        "#individualtasks #p7\n- [ ] a #p2\n- [ ] b #p9\n- [ ] c",
    )];
    let actions = compute_next_actions(&docs, &config, ymd(2024, 1, 1));
    assert!(!actions.is_empty());
    assert!(actions.iter().all(|a| (1..=2).contains(&a.priority)));
}

#[test]
fn test_store_reads_from_source() {
    let source = MemorySource::with_documents([
        ("Work/Launch.md", "#projects\n- [ ] Draft announcement #p1"),
        ("Scratch.md", "- [ ] Not tracked"),
    ]);
    let store = NextActionStore::new(&source);
    assert_eq!(store.load_documents().unwrap().len(), 2);

    let actions = store.next_actions(&Config::default(), ymd(2024, 1, 1)).unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].document.as_str(), "Work/Launch.md");

    let json = serde_json::to_value(&actions).unwrap();
    assert_eq!(json[0]["document"], "Work/Launch.md");
    assert_eq!(json[0]["priority"], 1);
    assert_eq!(json[0]["is_aggregate_view"], false);
}
