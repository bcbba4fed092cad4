use crate::workflows::query::Query;

const RESULT_HEADERS: [&str; 7] = ["#", "ID", "Language", "File name", "Format", "Rating", "Size"];

/// Ranked candidates of `query`, one row each, index first.
pub fn render_results(query: &Query) -> String {
    let rows = query
        .results()
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let mut row = vec![i.to_string()];
            row.extend(candidate.summary());
            row
        })
        .collect::<Vec<_>>();
    render(&RESULT_HEADERS, &rows)
}

/// The request fields of `query`, shown when nothing was found.
pub fn render_parameters(query: &Query) -> String {
    let rows = query
        .parameters()
        .iter()
        .map(|(key, value)| vec![key.clone(), value.clone()])
        .collect::<Vec<_>>();
    render(&["Parameter", "Value"], &rows)
}

fn render(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut out = vec![
        line(headers.iter().copied(), &widths),
        line(rule.iter().map(String::as_str), &widths),
    ];
    out.extend(rows.iter().map(|row| line(row.iter().map(String::as_str), &widths)));
    out.join("\n")
}

fn line<'a>(cells: impl IntoIterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .into_iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}
