//! Builders for test records.

#![allow(dead_code)]

use docket::record::{Competitor, SocialPost};
use docket::{BusinessRecord, ProjectRecord};

pub struct ProjectBuilder {
    record: ProjectRecord,
}

impl ProjectBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            record: ProjectRecord {
                notion_id: id.to_string(),
                project_name: format!("Project {}", id),
                business_name: "Acme".to_string(),
                status: "In Review".to_string(),
                team_department: "Design".to_string(),
                assigned_person: "Sam".to_string(),
                priority: "High".to_string(),
                due_date: "2024-06-01".to_string(),
                ..Default::default()
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.record.project_name = name.to_string();
        self
    }

    pub fn team(mut self, team: &str) -> Self {
        self.record.team_department = team.to_string();
        self
    }

    pub fn link(mut self, link: &str) -> Self {
        self.record.link = Some(link.to_string());
        self
    }

    pub fn approved(mut self, approved: bool) -> Self {
        self.record.approved = approved;
        self
    }

    pub fn build(self) -> ProjectRecord {
        self.record
    }
}

pub struct BusinessBuilder {
    record: BusinessRecord,
}

impl BusinessBuilder {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            record: BusinessRecord {
                id: id.to_string(),
                name: name.to_string(),
                website: format!("https://{}.test", name.to_lowercase()),
                ..Default::default()
            },
        }
    }

    pub fn product(mut self, product: &str) -> Self {
        self.record.product = Some(product.to_string());
        self
    }

    pub fn competitor(mut self, name: &str, products: &[&str]) -> Self {
        self.record.competitors.push(Competitor {
            name: name.to_string(),
            url: format!("https://{}.test", name.to_lowercase()),
            products: products.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        });
        self
    }

    pub fn website_urls(mut self, urls: &[&str]) -> Self {
        self.record.website_urls = urls.iter().map(|u| u.to_string()).collect();
        self
    }

    /// Adds one post under `site → platform_url → platform`.
    pub fn post(mut self, site: &str, platform_url: &str, platform: &str, post: SocialPost) -> Self {
        self.record
            .social_media_summary
            .entry(site.to_string())
            .or_default()
            .entry(platform_url.to_string())
            .or_default()
            .entry(platform.to_string())
            .or_default()
            .push(post);
        self
    }

    pub fn build(self) -> BusinessRecord {
        self.record
    }
}

/// A post with only `text` and `url` set.
pub fn text_post(text: &str, url: &str) -> SocialPost {
    SocialPost {
        text: Some(text.to_string()),
        url: Some(url.to_string()),
        ..Default::default()
    }
}
