//! Image and table styling rules for rendered article HTML

use crate::markup::Fragment;

/// Appended after enhanced content so floated images do not leak out
pub const CLEARFIX: &str = r#"<div style="clear: both;"></div>"#;

const IMAGE_BASE: &[(&str, &str)] = &[
    ("max-width", "100%"),
    ("height", "auto"),
    ("border-radius", "6px"),
    ("box-shadow", "0 4px 12px rgba(0,0,0,0.15)"),
    ("transition", "transform 0.2s ease"),
];

const IMAGE_FIGURE: &[(&str, &str)] = &[
    ("text-align", "center"),
    ("margin", "25px 0"),
    ("clear", "both"),
];

const IMAGE_IN_FIGURE: &[(&str, &str)] = &[("display", "block"), ("margin", "0 auto")];

const ALIGN_LEFT: &[(&str, &str)] = &[
    ("float", "left"),
    ("margin", "10px 20px 10px 0"),
    ("max-width", "50%"),
];

const ALIGN_RIGHT: &[(&str, &str)] = &[
    ("float", "right"),
    ("margin", "10px 0 10px 20px"),
    ("max-width", "50%"),
];

const ALIGN_CENTER: &[(&str, &str)] = &[
    ("display", "block"),
    ("margin", "20px auto"),
    ("float", "none"),
];

const TABLE_BASE: &[(&str, &str)] = &[
    ("width", "100%"),
    ("border-collapse", "collapse"),
    ("margin", "25px 0"),
    ("font-size", "14px"),
    ("box-shadow", "0 4px 12px rgba(0,0,0,0.1)"),
    ("border-radius", "8px"),
    ("overflow", "hidden"),
    ("background", "#fff"),
];

const TABLE_FIGURE: &[(&str, &str)] = &[
    ("text-align", "center"),
    ("margin", "25px 0"),
    ("clear", "both"),
    ("overflow-x", "auto"),
];

const TABLE_IN_FIGURE: &[(&str, &str)] = &[
    ("display", "inline-block"),
    ("text-align", "left"),
    ("margin", "0 auto"),
];

const HEADER_CELL: &[(&str, &str)] = &[
    ("background", "linear-gradient(135deg, #495057 0%, #6c757d 100%)"),
    ("color", "white"),
    ("padding", "15px 12px"),
    ("font-weight", "600"),
    ("font-size", "13px"),
    ("text-transform", "uppercase"),
    ("letter-spacing", "0.5px"),
    ("border", "none"),
];

const DATA_CELL: &[(&str, &str)] = &[
    ("padding", "12px"),
    ("border-bottom", "1px solid #e9ecef"),
    ("border-left", "none"),
    ("border-right", "none"),
    ("border-top", "none"),
];

const STRIPED_ROW: &[(&str, &str)] = &[("background", "#f8f9fa")];

const CENTERED_CHILD: &[(&str, &str)] = &[("display", "block"), ("margin", "20px auto")];

fn is_centered(style: &str) -> bool {
    style.contains("text-align: center") || style.contains("text-align:center")
}

/// Merge presentation styles into the images and tables of an HTML fragment.
///
/// Rules run in a fixed order and later rules override earlier values for the
/// same property: images, then tables, then children of centered containers.
/// A float-clearing `div` is appended unless the fragment already ends with one.
pub fn enhance_html(html: &str) -> String {
    let mut fragment = Fragment::parse(html);

    style_images(&mut fragment);
    style_tables(&mut fragment);
    style_centered_children(&mut fragment);

    let mut out = fragment.render();
    if !out.trim_end().ends_with(CLEARFIX) {
        out.push_str(CLEARFIX);
    }
    out
}

fn style_images(fragment: &mut Fragment) {
    for image in fragment.elements("img") {
        fragment.node_mut(image).apply(IMAGE_BASE);

        if let Some(figure) = fragment.closest(image, "figure") {
            if fragment.node(figure).has_class("image") {
                fragment.node_mut(figure).apply(IMAGE_FIGURE);
                fragment.node_mut(image).apply(IMAGE_IN_FIGURE);
            }
        }

        let class = fragment.node(image).class.clone();
        let parent_centered = fragment
            .node(image)
            .parent
            .is_some_and(|parent| is_centered(&fragment.node(parent).style_text()));

        if class.contains("image-style-align-left") {
            fragment.node_mut(image).apply(ALIGN_LEFT);
        } else if class.contains("image-style-align-right") {
            fragment.node_mut(image).apply(ALIGN_RIGHT);
        } else if class.contains("image-style-align-center") || parent_centered {
            fragment.node_mut(image).apply(ALIGN_CENTER);
        }
    }
}

fn style_tables(fragment: &mut Fragment) {
    for table in fragment.elements("table") {
        fragment.node_mut(table).apply(TABLE_BASE);

        if let Some(figure) = fragment.closest(table, "figure") {
            if fragment.node(figure).has_class("table") {
                fragment.node_mut(figure).apply(TABLE_FIGURE);
                fragment.node_mut(table).apply(TABLE_IN_FIGURE);
            }
        }

        for cell in fragment.descendants(table, "th") {
            fragment.node_mut(cell).apply(HEADER_CELL);
        }
        for cell in fragment.descendants(table, "td") {
            fragment.node_mut(cell).apply(DATA_CELL);
        }

        // Zero-based even rows of the body: first, third, ...
        let body_rows: Vec<usize> = fragment
            .descendants(table, "tr")
            .into_iter()
            .filter(|&row| {
                fragment
                    .ancestors(row)
                    .take_while(|&a| a != table)
                    .any(|a| fragment.node(a).tag == "tbody")
            })
            .collect();
        for row in body_rows.into_iter().step_by(2) {
            fragment.node_mut(row).apply(STRIPED_ROW);
        }
    }
}

fn style_centered_children(fragment: &mut Fragment) {
    for container in 0..fragment.len() {
        if !is_centered(&fragment.node(container).style_text()) {
            continue;
        }
        let mut children = fragment.descendants(container, "img");
        children.extend(fragment.descendants(container, "table"));
        children.sort_unstable();
        for child in children {
            fragment.node_mut(child).apply(CENTERED_CHILD);
        }
    }
}
