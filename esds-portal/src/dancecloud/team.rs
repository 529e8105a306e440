//! Door volunteers team
//!
//! Access to the point-of-sale app on the door is granted by membership of
//! a single DanceCloud team.

use super::{DanceCloudClient, DanceCloudResult, MemberAttributes};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use shared::models::DoorVolunteer;
use tracing::{debug, info, instrument, warn};

/// Team membership operations behind the door volunteers routes
#[async_trait]
pub trait PosTeam: Send + Sync {
    async fn list_volunteers(&self) -> DanceCloudResult<Vec<DoorVolunteer>>;

    /// `email` must belong to an existing DanceCloud account
    async fn add_volunteer(&self, email: &str) -> DanceCloudResult<()>;

    async fn remove_volunteer(&self, volunteer_id: &str) -> DanceCloudResult<()>;
}

#[derive(Debug, Deserialize)]
struct TeamMembersDocument {
    data: Vec<TeamMemberResource>,
}

#[derive(Debug, Deserialize)]
struct TeamMemberResource {
    #[serde(rename = "type")]
    kind: String,
    id: String,
    #[serde(default)]
    attributes: serde_json::Value,
}

fn parse_team_members(document: TeamMembersDocument) -> Vec<DoorVolunteer> {
    document
        .data
        .into_iter()
        .filter(|r| r.kind == "team-members")
        .filter_map(|r| match MemberAttributes::deserialize(&r.attributes) {
            Ok(member) => Some(DoorVolunteer {
                volunteer_id: r.id,
                first_name: member.first_name,
                last_name: member.last_name,
                email: member.email,
            }),
            Err(e) => {
                warn!(volunteer_id = %r.id, error = %e, "malformed team member, skipped");
                None
            }
        })
        .collect()
}

/// The DanceCloud team that holds door volunteers
#[derive(Debug, Clone)]
pub struct DoorVolunteerTeam {
    client: DanceCloudClient,
    team_id: String,
}

impl DoorVolunteerTeam {
    pub fn new(client: DanceCloudClient, team_id: impl Into<String>) -> Self {
        Self {
            client,
            team_id: team_id.into(),
        }
    }
}

#[async_trait]
impl PosTeam for DoorVolunteerTeam {
    #[instrument(skip(self), fields(team_id = %self.team_id))]
    async fn list_volunteers(&self) -> DanceCloudResult<Vec<DoorVolunteer>> {
        let document: TeamMembersDocument = self
            .client
            .get_document(&format!("teams/{}/members", self.team_id), &[])
            .await?;
        let volunteers = parse_team_members(document);
        debug!(count = volunteers.len(), "door volunteers fetched");
        Ok(volunteers)
    }

    #[instrument(skip(self), fields(team_id = %self.team_id))]
    async fn add_volunteer(&self, email: &str) -> DanceCloudResult<()> {
        let body = serde_json::json!({
            "data": {
                "type": "team-members",
                "attributes": { "email": email },
                "relationships": {
                    "team": { "data": { "type": "teams", "id": self.team_id } }
                },
            }
        });
        self.client
            .send_document(Method::POST, "team-members", body)
            .await?;

        info!("door volunteer added");
        Ok(())
    }

    #[instrument(skip(self), fields(team_id = %self.team_id))]
    async fn remove_volunteer(&self, volunteer_id: &str) -> DanceCloudResult<()> {
        let response = self
            .client
            .request(Method::DELETE, &format!("team-members/{volunteer_id}"))
            .send()
            .await?;
        DanceCloudClient::check_status(response).await?;

        info!("door volunteer removed");
        Ok(())
    }
}
