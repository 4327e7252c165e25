#![allow(dead_code)]

use markup5ever_rcdom::{Handle, NodeData};
use safemark::Fragment;
use std::sync::Once;

static INIT: Once = Once::new();

/// Route library logs to the test harness output once per binary.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("safemark=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Every element in `html` as (tag, attributes), in document order.
pub fn elements(html: &str) -> Vec<(String, Vec<(String, String)>)> {
    let fragment = Fragment::parse(html);
    let mut found = Vec::new();
    collect(fragment.root(), &mut found);
    found
}

fn collect(node: &Handle, found: &mut Vec<(String, Vec<(String, String)>)>) {
    for child in node.children.borrow().iter() {
        if let NodeData::Element { name, attrs, .. } = &child.data {
            let attrs = attrs
                .borrow()
                .iter()
                .map(|a| (a.name.local.to_string(), a.value.to_string()))
                .collect();
            found.push((name.local.to_string(), attrs));
        }
        collect(child, found);
    }
}

pub fn tag_names(html: &str) -> Vec<String> {
    elements(html).into_iter().map(|(tag, _)| tag).collect()
}

/// Value of `attr` on the first `tag` element.
pub fn attr_of(html: &str, tag: &str, attr: &str) -> Option<String> {
    elements(html)
        .into_iter()
        .find(|(name, _)| name == tag)
        .and_then(|(_, attrs)| attrs.into_iter().find(|(n, _)| n == attr).map(|(_, v)| v))
}

/// XSS payloads in assorted casings and nestings.
pub const SCRIPT_PAYLOADS: &[&str] = &[
    "<script>alert(1)</script>",
    "<SCRIPT>alert(1)</SCRIPT>",
    "<ScRiPt src=\"https://evil.example/x.js\"></sCrIpT>",
    "<div><p><script>alert(1)</script></p></div>",
    "<scr<script>ipt>alert(1)</script>",
    "<img src=x onerror=alert(1)>",
    "<IMG SRC=\"/a.png\" ONERROR=\"alert(1)\">",
    "<svg onload=alert(1)><script>alert(1)</script></svg>",
    "<a href=\"#\" onclick=\"alert(1)\">x</a>",
    "<body onload=alert(1)>text</body>",
    "<iframe src=\"https://www.youtube.com/embed/x\" onload=\"alert(1)\"></iframe>",
    "<div style=\"color: red\" onmouseover=\"alert(1)\">hover</div>",
    "<math><mi xlink:href=\"javascript:alert(1)\">x</mi></math>",
    "# Title\n\n<script>\nalert(1)\n</script>\n\ntext",
];
