use encoding_rs::WINDOWS_1252;
use scraper::{ElementRef, Html, Selector};

use crate::domain::models::ScrapedCandidate;
use crate::error::{Error, Result};

const TITLE_BLOCK: &str = r#"div[id="menu_detalle_buscador"]"#;
const BODY_BLOCK: &str = r#"div[id="buscador_detalle"]"#;
const DESCRIPTION: &str = r#"div[id="buscador_detalle_sub"]"#;
const DOWNLOAD_ANCHOR: &str = "a.link1";
const DOWNLOAD_MARKER: &str = "bajar";
const TITLE_PREFIX: &str = "Subtitulo de ";

/// The site serves Latin-1; every byte maps to some character.
pub fn decode_latin1(bytes: &[u8]) -> String {
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text.into_owned()
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::ParseResponse(format!("Invalid selector {css}: {e}")))
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>()
}

/// Title blocks and body blocks come in matching order, one pair per
/// subtitle.
pub fn parse_search_page(html: &str) -> Result<Vec<ScrapedCandidate>> {
    let document = Html::parse_document(html);
    let anchor = selector("a")?;
    let description = selector(DESCRIPTION)?;

    let titles: Vec<ElementRef> = document.select(&selector(TITLE_BLOCK)?).collect();
    let bodies: Vec<ElementRef> = document.select(&selector(BODY_BLOCK)?).collect();
    if bodies.len() < titles.len() {
        return Err(Error::ParseResponse(format!(
            "{} titles but only {} descriptions",
            titles.len(),
            bodies.len()
        )));
    }

    titles
        .into_iter()
        .zip(bodies)
        .map(|(title_block, body_block)| {
            let link = title_block
                .select(&anchor)
                .next()
                .ok_or_else(|| Error::ParseResponse("Subtitle title without link".to_string()))?;
            let href = link
                .value()
                .attr("href")
                .ok_or_else(|| Error::ParseResponse("Subtitle link without href".to_string()))?;
            let description = body_block
                .select(&description)
                .next()
                .map(text_of)
                .ok_or_else(|| {
                    Error::ParseResponse("Subtitle without description".to_string())
                })?;

            Ok(ScrapedCandidate {
                page_link: href.to_string(),
                description,
                title: text_of(link).replace(TITLE_PREFIX, ""),
            })
        })
        .collect()
}

pub fn parse_download_link(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    document
        .select(&selector(DOWNLOAD_ANCHOR)?)
        .filter_map(|anchor| anchor.value().attr("href"))
        .find(|href| href.contains(DOWNLOAD_MARKER))
        .map(str::to_string)
        .ok_or_else(|| Error::ParseResponse("Download link not found".to_string()))
}

#[cfg(test)]
pub mod fixtures {
    /// A results page with `count` entries whose descriptions mention
    /// `group`.
    pub fn search_page(count: usize, group: &str) -> String {
        let mut html = String::from("<html><body>");
        for i in 0..count {
            html.push_str(&format!(
                "<div id=\"menu_detalle_buscador\"><a class=\"titulo_menu_izq\" \
                 href=\"http://www.subdivx.com/X6X{i}\">Subtitulo de Show {i}</a></div>\
                 <div id=\"buscador_detalle\"><div id=\"buscador_detalle_sub\">version {group} {i}</div>\
                 <div id=\"buscador_detalle_sub_datos\">Downloads: 10</div></div>"
            ));
        }
        html.push_str("</body></html>");
        html
    }
}
