//! Competitor-analysis records for a business.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::lenient::or_empty;
use super::{
    join_non_empty, non_empty, opt_or_missing, or_missing, ExportRecord, RowGroup, Section,
    TableRow, MISSING,
};

/// Site URL → platform URL → platform name → scraped posts.
pub type SocialMediaSummary = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<SocialPost>>>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    #[serde(default, alias = "_id", deserialize_with = "or_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub website: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub social_media: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub product: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub competitors: Vec<Competitor>,
    #[serde(default, deserialize_with = "or_empty")]
    pub competitors_website_data: Vec<WebsiteSnapshot>,
    #[serde(default, deserialize_with = "or_empty")]
    pub social_media_summary: SocialMediaSummary,
    #[serde(default, deserialize_with = "or_empty")]
    pub website_urls: Vec<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub extracted_social_links: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    #[serde(default, deserialize_with = "or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub products: Vec<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub services: Vec<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub about: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub vision: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub history: String,
}

impl Competitor {
    fn fields(&self) -> [(&'static str, String); 8] {
        [
            ("Name", or_missing(&self.name)),
            ("Website", or_missing(&self.url)),
            ("Description", or_missing(&self.description)),
            (
                "Products",
                join_non_empty(&self.products, ", ").unwrap_or_else(|| MISSING.to_string()),
            ),
            (
                "Services",
                join_non_empty(&self.services, ", ").unwrap_or_else(|| MISSING.to_string()),
            ),
            ("About", or_missing(&self.about)),
            ("Vision", or_missing(&self.vision)),
            ("History", or_missing(&self.history)),
        ]
    }

    fn describe(&self, separator: &str) -> String {
        self.fields()
            .iter()
            .map(|(label, value)| format!("{}: {}", label, value))
            .collect::<Vec<_>>()
            .join(separator)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsiteSnapshot {
    #[serde(default, deserialize_with = "or_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "or_empty")]
    pub content: String,
}

/// A scraped social post. Which fields are populated depends on the platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialPost {
    #[serde(default, deserialize_with = "or_empty")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub time_since_posted: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub author_name: Option<String>,

    // LinkedIn
    #[serde(default, deserialize_with = "or_empty")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub picture: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub about: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub education: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub experiences: Option<String>,

    // Instagram
    #[serde(default, deserialize_with = "or_empty")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub followers_count: Option<u64>,
    #[serde(default, deserialize_with = "or_empty")]
    pub biography: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub external_url: Option<String>,

    // X
    #[serde(default, rename = "full_text", deserialize_with = "or_empty")]
    pub full_text: Option<String>,
    #[serde(default, rename = "favorite_count", deserialize_with = "or_empty")]
    pub favorite_count: Option<u64>,
    #[serde(default, deserialize_with = "or_empty")]
    pub permalink: Option<String>,

    // Facebook
    #[serde(default, deserialize_with = "or_empty")]
    pub facebook_url: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub likes: Option<u64>,

    // YouTube
    #[serde(default, deserialize_with = "or_empty")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub view_count: Option<u64>,
    #[serde(default, deserialize_with = "or_empty")]
    pub channel_name: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub number_of_subscribers: Option<u64>,
    #[serde(default, deserialize_with = "or_empty")]
    pub channel_description: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "or_empty")]
    pub thumbnail_url: Option<String>,
}

fn count(value: Option<u64>) -> String {
    value.unwrap_or(0).to_string()
}

impl SocialPost {
    /// Label/value pairs for this post, including the platform-specific
    /// block when the post carries that platform's marker field.
    pub fn describe(&self, platform: &str) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("URL", opt_or_missing(self.url.as_deref())),
            ("Text", opt_or_missing(self.text.as_deref())),
            (
                "Time Since Posted",
                opt_or_missing(self.time_since_posted.as_deref()),
            ),
            ("Author", opt_or_missing(self.author_name.as_deref())),
        ];

        match platform {
            "LinkedIn" => fields.extend([
                ("Name", opt_or_missing(self.name.as_deref())),
                ("Picture URL", opt_or_missing(self.picture.as_deref())),
                ("LinkedIn URL", opt_or_missing(self.url.as_deref())),
                ("About", opt_or_missing(self.about.as_deref())),
                ("Location", opt_or_missing(self.location.as_deref())),
                ("Education", opt_or_missing(self.education.as_deref())),
                ("Experiences", opt_or_missing(self.experiences.as_deref())),
            ]),
            "Instagram" if self.username.is_some() => fields.extend([
                ("Username", opt_or_missing(self.username.as_deref())),
                ("Full Name", opt_or_missing(self.full_name.as_deref())),
                ("Followers", count(self.followers_count)),
                ("Biography", opt_or_missing(self.biography.as_deref())),
                ("External Link", opt_or_missing(self.external_url.as_deref())),
            ]),
            "X" if self.full_text.is_some() => fields.extend([
                ("Tweet", opt_or_missing(self.full_text.as_deref())),
                ("Likes", count(self.favorite_count)),
                (
                    "Permalink",
                    format!("https://x.com{}", self.permalink.as_deref().unwrap_or("")),
                ),
            ]),
            "Facebook" if self.facebook_url.is_some() => fields.extend([
                ("Facebook URL", opt_or_missing(self.facebook_url.as_deref())),
                ("Post Text", opt_or_missing(self.text.as_deref())),
                ("Likes", count(self.likes)),
            ]),
            "YouTube" if self.url.is_some() => fields.extend([
                ("Video Title", opt_or_missing(self.title.as_deref())),
                ("Views", count(self.view_count)),
                ("Channel Name", opt_or_missing(self.channel_name.as_deref())),
                ("Subscribers", count(self.number_of_subscribers)),
                (
                    "Channel Description",
                    opt_or_missing(self.channel_description.as_deref()),
                ),
                (
                    "Video Date",
                    self.date
                        .as_deref()
                        .and_then(non_empty)
                        .unwrap_or_else(|| "Date not available".to_string()),
                ),
                ("Thumbnail", opt_or_missing(self.thumbnail_url.as_deref())),
            ]),
            _ => {}
        }

        fields
    }
}

impl BusinessRecord {
    /// Flattens the summary into `(site, platform url, platform name, posts)`
    /// tuples in key order.
    fn platform_feeds(&self) -> Vec<(&str, &str, &str, &[SocialPost])> {
        let mut feeds = Vec::new();
        for (site, platforms) in &self.social_media_summary {
            for (platform_url, by_name) in platforms {
                for (platform_name, posts) in by_name {
                    feeds.push((
                        site.as_str(),
                        platform_url.as_str(),
                        platform_name.as_str(),
                        posts.as_slice(),
                    ));
                }
            }
        }
        feeds
    }

    fn social_summary_text(&self) -> String {
        if self.social_media_summary.is_empty() {
            return MISSING.to_string();
        }

        let sites: Vec<String> = self
            .social_media_summary
            .iter()
            .map(|(site, platforms)| {
                let platform_blocks: Vec<String> = platforms
                    .iter()
                    .map(|(platform_url, by_name)| {
                        let names: Vec<String> = by_name
                            .iter()
                            .map(|(platform_name, posts)| {
                                let mut block = format!("  Platform Name: {}\n", platform_name);
                                if posts.is_empty() {
                                    block.push_str("    No posts available\n");
                                }
                                for (index, post) in posts.iter().enumerate() {
                                    let _ = writeln!(block, "    Post {}:", index + 1);
                                    for (label, value) in post.describe(platform_name) {
                                        let _ = writeln!(block, "      {}: {}", label, value);
                                    }
                                }
                                block
                            })
                            .collect();
                        format!("Platform URL: {}\n\n{}", platform_url, names.join("\n"))
                    })
                    .collect();
                format!("URL: {}\n\n{}", site, platform_blocks.join("\n\n"))
            })
            .collect();

        sites.join("\n\n")
    }
}

impl ExportRecord for BusinessRecord {
    fn record_id(&self) -> String {
        self.id.clone()
    }

    fn title(&self) -> String {
        format!("Competitor: {}", or_missing(&self.name))
    }

    fn sections(&self) -> Vec<Section> {
        let competitors = if self.competitors.is_empty() {
            MISSING.to_string()
        } else {
            self.competitors
                .iter()
                .map(|c| c.describe("\n"))
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let website_data = if self.competitors_website_data.is_empty() {
            MISSING.to_string()
        } else {
            self.competitors_website_data
                .iter()
                .map(|d| format!("URL: {}\nContent: {}", d.url, d.content))
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        vec![
            Section::new("Website", or_missing(&self.website)),
            Section::new("Product", opt_or_missing(self.product.as_deref())),
            Section::new("Location", opt_or_missing(self.location.as_deref())),
            Section::new("Competitors", competitors),
            Section::new("Competitors Website Data", website_data),
            Section::new(
                "Website URLs",
                join_non_empty(&self.website_urls, ", ").unwrap_or_else(|| MISSING.to_string()),
            ),
            Section::new(
                "Extracted Social Links",
                join_non_empty(&self.extracted_social_links, " | ")
                    .unwrap_or_else(|| MISSING.to_string()),
            ),
            Section::new("Social Media Summary", self.social_summary_text()),
        ]
    }

    fn table_row(&self) -> TableRow {
        let competitors: Vec<String> = self.competitors.iter().map(|c| c.describe(", ")).collect();
        let website_data: Vec<String> = self
            .competitors_website_data
            .iter()
            .map(|d| format!("URL: {}, Content: {}", d.url, d.content))
            .collect();

        let mut row = TableRow::default();
        row.cell("id", non_empty(&self.id))
            .cell("name", non_empty(&self.name))
            .cell("website", non_empty(&self.website))
            .cell("product", self.product.as_deref().and_then(non_empty))
            .cell("location", self.location.as_deref().and_then(non_empty))
            .cell("website_urls", join_non_empty(&self.website_urls, ", "))
            .cell(
                "extracted_social_links",
                join_non_empty(&self.extracted_social_links, " | "),
            )
            .cell("competitors", join_non_empty(&competitors, " | "))
            .cell(
                "competitors_website_data",
                join_non_empty(&website_data, " | "),
            );

        for (site, platform_url, platform_name, posts) in self.platform_feeds() {
            row.group(RowGroup {
                label: Some(format!(
                    "URL: {}, Platform URL: {}, Platform Name: {}",
                    site, platform_url, platform_name
                )),
                items: posts
                    .iter()
                    .map(|post| {
                        post.describe(platform_name)
                            .iter()
                            .map(|(label, value)| format!("{}: {}", label, value))
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .collect(),
            });
        }

        row
    }
}
