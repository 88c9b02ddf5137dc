//! Static prose and headings around each section.

use super::section::{Heading, HeadingLevel, Narrative, Paragraph, SectionId};

const DATASET_URL: &str = "https://www.kaggle.com/datasets/arindam235/startup-investments-crunchbase";
const ISRAEL_CRISIS_URL: &str = "https://en.wikipedia.org/wiki/1983_Israel_bank_stock_crisis";
const GFC_URL: &str = "https://en.wikipedia.org/wiki/Financial_crisis_of_2007%E2%80%932008";

fn heading(level: HeadingLevel, text: &str) -> Heading {
    Heading {
        level,
        text: text.to_string(),
    }
}

fn p() -> Paragraph {
    Paragraph::default()
}

pub fn headings(id: SectionId) -> Vec<Heading> {
    use HeadingLevel::*;
    match id {
        SectionId::Intro => vec![heading(PageTitle, "Crunchbase startups: from 20th century to 2014")],
        SectionId::Describe => vec![heading(Title, "Some statistics per feature")],
        SectionId::TopMarkets => vec![heading(Title, "Overview")],
        SectionId::Correlation => vec![
            heading(Title, "Closer analysis"),
            heading(Subheader, "Correlation"),
        ],
        SectionId::DebtScatter => vec![heading(Question, "Question:")],
        SectionId::FundingByYear | SectionId::ClosureMarkets | SectionId::SeedQuarterScatter => {
            vec![heading(Question, "Hypothesis:")]
        }
        _ => Vec::new(),
    }
}

/// Text placed above the chart.
pub fn lead(id: SectionId) -> Narrative {
    let paragraphs = match id {
        SectionId::Intro => vec![
            p().text(
                "Crunchbase is the leading destination for company insights from early-stage \
                 startups to the Fortune 1000. The dataset from Kaggle describes information \
                 scrapped from Crunchbase API.",
            ),
            p().text("Link to the dataset: ").link(DATASET_URL, DATASET_URL),
        ],
        SectionId::DebtScatter => vec![p()
            .text("The plot shows high positive correlation between ")
            .strong("debt_financing")
            .text(" and ")
            .strong("funding_total_usd")
            .text(". Why so?")],
        SectionId::FundingByYear => vec![
            p().text("Every year startups need more $$$ to raise. Is that true?"),
            p().text("Let's calculate total funding by year and make a line plot:"),
        ],
        SectionId::ClosureMarkets => vec![
            p().text("Your startup will less likely close at less popular market."),
            p().text("Let's see that on a heatmap."),
        ],
        SectionId::SeedQuarterScatter => vec![
            p().text("The ")
                .strong("seed")
                .text(" (the first official investment round) you raise depends on the ")
                .strong("founded quarter")
                .text("."),
            p().text("Are there any 'good' quarters to start your first fund raising?"),
        ],
        _ => Vec::new(),
    };
    Narrative::new(paragraphs)
}

/// Text placed below the chart.
pub fn commentary(id: SectionId) -> Narrative {
    let paragraphs = match id {
        SectionId::Status => vec![p().text("Most startups are operational, and that's good!")],
        SectionId::Sources => vec![p().text(
            "This makes sense, because venture capitals are provided by professional investors \
             and give startups way more funding",
        )],
        SectionId::TopCountries => vec![p()
            .emphasis("Hmmm")
            .text(", will the funding be also biggest in the USA? Let's check!")],
        SectionId::CountryFunding => vec![p()
            .text("No surprise here! Go to the US if you want to raise more money. But ")
            .strong("be aware")
            .text(" of the competitors:")],
        SectionId::TopCompanies => vec![p().text(
            "Seems like company's success doesn't really depend on the year it was founded",
        )],
        SectionId::DebtScatter => vec![p().text(
            "Now it's clear that the more money you need for the startup, the more \
             debt_financing you'll need.",
        )],
        SectionId::FundingByYear => vec![
            p().text("From this graph, economic recessions can clearly be seen. In the 1983, ")
                .link("Israel bank stock crisis", ISRAEL_CRISIS_URL)
                .text(
                    " hit the market and the banks no longer had the capital to buy back shares \
                     and to support the prices causing share prices to collapse. Then, from 1984 \
                     to 2007, startups raised more and more $$$ each year, until the ",
                )
                .link("Global Financial Crisis in 2007", GFC_URL)
                .text(", the most serious in the 21st century."),
            p().text("So, the ")
                .strong("hypothesis is partly true")
                .text(
                    ". Indeed, startups raise more and more capital each year, but it strongly \
                     depends on the global events like crises.",
                ),
        ],
        SectionId::ClosureMarkets => vec![
            p().text(
                "The hypothesis turns out to be true! The closer market to the top, the more \
                 'yellow' (bigger) its market share becomes.",
            ),
            p().text("Thus, choose less popular markets to succeed!"),
        ],
        SectionId::SeedQuarterCounts => vec![
            p().text("Unfortunately, no. Seed capital seems to depend on other factors."),
            p().text("However, ")
                .strong("the biggest number")
                .text(" of seeds raised was at the ")
                .strong("1st Quarter")
                .text("! That's the most popular time startups raise their first money"),
        ],
        _ => Vec::new(),
    };
    Narrative::new(paragraphs)
}
