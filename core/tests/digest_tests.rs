use codequest_core::{
    render_digest, render_digest_with, Branding, DigestError, ResultItem, ResultSet, Source,
    MAX_DIGEST_BYTES,
};

fn items(source: Source, n: usize, title_len: usize) -> Vec<ResultItem> {
    (0..n)
        .map(|i| ResultItem {
            source,
            title: format!("{i}-{}", "t".repeat(title_len)),
            body: "lorem ipsum ".repeat(40),
            score: i as i64,
            secondary_metric: 2,
            created_at: 1_700_000_000,
            link: match source {
                Source::Reddit => format!("/r/rust/comments/{i}/"),
                Source::StackOverflow => format!("https://stackoverflow.com/questions/{i}"),
            },
        })
        .collect()
}

#[test]
fn caps_each_source_at_five_rows() {
    let set = ResultSet::new(items(Source::Reddit, 10, 8), items(Source::StackOverflow, 10, 8));
    let digest = render_digest(&set, "rust").unwrap();
    assert_eq!(digest.rows.len(), 10);
    assert!(digest.rows[..5].iter().all(|r| r.item.starts_with("Reddit: ")));
    assert!(digest.rows[5..].iter().all(|r| r.item.starts_with("Stack Overflow: ")));
    assert_eq!(digest.rows[0].item, format!("Reddit: 0-{}", "t".repeat(8)));
}

#[test]
fn rows_carry_links_and_bounded_previews() {
    let set = ResultSet::new(items(Source::Reddit, 1, 4), items(Source::StackOverflow, 1, 4));
    let digest = render_digest(&set, "lifetimes").unwrap();
    assert_eq!(digest.rows[0].link, "https://reddit.com/r/rust/comments/0/");
    assert_eq!(digest.rows[1].link, "https://stackoverflow.com/questions/0");
    for row in &digest.rows {
        assert!(row.description.len() <= 203);
        assert!(row.description.ends_with("..."));
        assert_eq!(row.secondary_metric, 2);
    }
}

#[test]
fn document_has_greeting_intro_table_and_signature() {
    let set = ResultSet::new(items(Source::Reddit, 2, 4), vec![]);
    let digest = render_digest(&set, "async traits").unwrap();
    let needles = [
        "Hi CodeQuest User,",
        "Here are your search results for: &quot;async traits&quot;",
        "Content Preview",
        "Best regards,",
    ];
    for needle in needles {
        assert!(digest.html_body.contains(needle), "html missing {needle}");
    }
    assert!(digest.text_body.contains("Here are your search results for: \"async traits\""));
    assert!(digest.text_body.contains("Thank you for using CodeQuest Search!"));
    assert_eq!(digest.byte_size, digest.html_body.len());
}

#[test]
fn custom_branding_is_used() {
    let branding = Branding {
        product_name: "Acme Finder".into(),
        product_link: Some("https://acme.test/".into()),
    };
    let set = ResultSet::new(items(Source::Reddit, 1, 4), vec![]);
    let digest = render_digest_with(&set, "q", &branding).unwrap();
    assert!(digest.html_body.contains(r#"href="https://acme.test/""#));
    assert!(digest.text_body.ends_with("Best regards,\nAcme Finder\n"));
}

#[test]
fn oversize_html_is_rejected() {
    // Titles are not truncated, so long ones push the document over the cap.
    let set =
        ResultSet::new(items(Source::Reddit, 5, 6_000), items(Source::StackOverflow, 5, 6_000));
    match render_digest(&set, "big") {
        Err(DigestError::TooLarge { size, limit }) => {
            assert_eq!(limit, MAX_DIGEST_BYTES);
            assert!(size > MAX_DIGEST_BYTES);
        }
        other => panic!("expected TooLarge, got {other:?}"),
    }
}
