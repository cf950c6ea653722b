use lectern_core::{
    Element, LecternConfig, MemoryElement, MemoryPage, MountOutcome, Readiness, Widget,
    WidgetContext,
};
use lectern_enhance::{enhance_html, EnhanceWidget, Fragment, StyleMap, CLEARFIX};
use std::sync::Arc;

fn styles(html: &str, tag: &str) -> Vec<StyleMap> {
    let fragment = Fragment::parse(html);
    fragment
        .elements(tag)
        .into_iter()
        .map(|i| fragment.node(i).style().clone())
        .collect()
}

#[test]
fn test_image_figure_is_centered() {
    let html = enhance_html(
        r#"<figure class="image"><img src="/media/a.png" alt="a"><figcaption>A</figcaption></figure>"#,
    );

    let figure = &styles(&html, "figure")[0];
    assert_eq!(figure.get("text-align"), Some("center"));
    assert_eq!(figure.get("margin"), Some("25px 0"));
    assert_eq!(figure.get("clear"), Some("both"));

    // The figure is now a centered container, so its image takes the centered margin.
    let image = &styles(&html, "img")[0];
    assert_eq!(image.get("display"), Some("block"));
    assert_eq!(image.get("margin"), Some("20px auto"));
    assert_eq!(image.get("max-width"), Some("100%"));
}

#[test]
fn test_image_in_centered_paragraph() {
    let html = enhance_html(r#"<p style="text-align:center"><img src="a.png"></p>"#);
    let image = &styles(&html, "img")[0];
    assert_eq!(image.get("float"), Some("none"));
    assert_eq!(image.get("margin"), Some("20px auto"));
    assert!(html.starts_with(r#"<p style="text-align:center">"#));
}

#[test]
fn test_table_cells_and_striping() {
    let html = enhance_html(
        "<table><thead><tr><th>Name</th></tr></thead><tbody>\
         <tr><td>1</td></tr><tr><td>2</td></tr><tr><td>3</td></tr></tbody></table>",
    );

    let table = &styles(&html, "table")[0];
    assert_eq!(table.get("border-collapse"), Some("collapse"));
    assert_eq!(table.get("background"), Some("#fff"));

    let header = &styles(&html, "th")[0];
    assert_eq!(header.get("text-transform"), Some("uppercase"));
    assert_eq!(header.get("color"), Some("white"));

    for cell in styles(&html, "td") {
        assert_eq!(cell.get("border-bottom"), Some("1px solid #e9ecef"));
        assert_eq!(cell.get("padding"), Some("12px"));
    }

    let rows = styles(&html, "tr");
    assert_eq!(rows[0].get("background"), None, "header row is not striped");
    assert_eq!(rows[1].get("background"), Some("#f8f9fa"));
    assert_eq!(rows[2].get("background"), None);
    assert_eq!(rows[3].get("background"), Some("#f8f9fa"));
}

#[test]
fn test_table_figure() {
    let html = enhance_html(r#"<figure class="table"><table><tr><td>x</td></tr></table></figure>"#);

    let figure = &styles(&html, "figure")[0];
    assert_eq!(figure.get("overflow-x"), Some("auto"));

    let table = &styles(&html, "table")[0];
    assert_eq!(table.get("text-align"), Some("left"));
    // Centered-container rule runs last and wins for display and margin.
    assert_eq!(table.get("display"), Some("block"));
    assert_eq!(table.get("margin"), Some("20px auto"));
}

#[test]
fn test_other_markup_is_preserved() {
    let source = r#"<h2 id="intro">Intro</h2><p>Math: <span class="math">$x^2$</span></p>"#;
    assert_eq!(enhance_html(source), format!("{}{}", source, CLEARFIX));
}

#[tokio::test]
async fn test_widget_enhances_article_container() {
    let page = Arc::new(MemoryPage::new());
    let article = Arc::new(MemoryElement::with_html(r#"<p><img src="a.png"></p>"#));
    page.insert(".article-content", article.clone());

    let context = WidgetContext::new(page, Arc::new(LecternConfig::default()), Readiness::ready(()));
    let mut widget = EnhanceWidget::new();

    assert_eq!(widget.mount(&context).await.unwrap(), MountOutcome::Mounted);
    assert_eq!(widget.enhanced(), 1);
    assert!(article.inner_html().contains("max-width: 100%;"));
    assert!(article.inner_html().ends_with(CLEARFIX));
}

#[tokio::test]
async fn test_widget_without_containers_is_not_applicable() {
    let context = WidgetContext::new(
        Arc::new(MemoryPage::new()),
        Arc::new(LecternConfig::default()),
        Readiness::ready(()),
    );
    let mut widget = EnhanceWidget::new();
    assert_eq!(
        widget.mount(&context).await.unwrap(),
        MountOutcome::NotApplicable
    );
}
