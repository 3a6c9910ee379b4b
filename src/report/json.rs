//! JSON report output

use crate::report::Report;
use std::io::{self, Write};

pub fn write<W: Write>(writer: &mut W, report: &Report) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backdrop::Backdrop;
    use crate::report::tests::sample_view;
    use serde_json::Value;

    fn render(report: &Report) -> Value {
        let mut out = Vec::new();
        write(&mut out, report).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn test_json_is_the_serialized_view() {
        let view = sample_view();
        let json = render(&Report::new("https://youtu.be/abc", &view));

        assert_eq!(json["url"], "https://youtu.be/abc");
        assert_eq!(json["summary"]["total"], 3);
        assert_eq!(json["summary"]["flagged_rows"], 2);
        assert_eq!(json["view"]["top_topic"], "Politics");
        assert_eq!(json["view"]["rows"][1]["censorable"], true);
        assert_eq!(json["view"]["topic_pie"]["size"]["width"], 175);
        assert_eq!(json["panels"]["advanced"]["shown"], false);
    }

    #[test]
    fn test_legend_order_survives() {
        let view = sample_view();
        let json = render(&Report::new("u", &view));
        let labels: Vec<&str> = json["view"]["topic_legend"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["label"].as_str().unwrap())
            .collect();
        assert_eq!(labels, ["politics", "others", "threat"]);
    }

    #[test]
    fn test_backdrop_not_serialized() {
        let view = sample_view();
        let json = render(&Report::new("u", &view).with_backdrop(&Backdrop::new(100, 100, 1)));
        assert!(json.get("backdrop").is_none());
    }
}
