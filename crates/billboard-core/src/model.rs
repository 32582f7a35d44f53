// ABOUTME: Defines the User and Announcement documents plus their populated and patch shapes.
// ABOUTME: Field names serialize the way the document store exposes them (_id, camelCase).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// A registered user and the set of announcements they have posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Ulid,
    pub name: String,
    pub email: String,
    pub avatar: String,
    #[serde(default)]
    pub all_announcements: BTreeSet<Ulid>,
}

impl User {
    /// Create a user with a fresh id and no announcements.
    pub fn new(name: String, email: String, avatar: String) -> Self {
        Self {
            id: Ulid::new(),
            name,
            email,
            avatar,
            all_announcements: BTreeSet::new(),
        }
    }

    /// Record `announcement` as authored by this user. Returns false if it was already present.
    pub fn link(&mut self, announcement: Ulid) -> bool {
        self.all_announcements.insert(announcement)
    }

    /// Drop `announcement` from this user's set. Returns false if it was absent.
    pub fn unlink(&mut self, announcement: Ulid) -> bool {
        self.all_announcements.remove(&announcement)
    }

    pub fn owns(&self, announcement: Ulid) -> bool {
        self.all_announcements.contains(&announcement)
    }
}

/// Request body for registering a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
}

/// User-supplied content of an announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementFields {
    pub title: String,
    pub description: String,
    pub announcement_type: String,
}

/// An announcement as stored, with its creator held by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    #[serde(rename = "_id")]
    pub id: Ulid,
    pub title: String,
    pub description: String,
    pub announcement_type: String,
    pub photo: String,
    pub creator: Ulid,
}

impl Announcement {
    pub fn new(fields: AnnouncementFields, photo: String, creator: Ulid) -> Self {
        Self {
            id: Ulid::new(),
            title: fields.title,
            description: fields.description,
            announcement_type: fields.announcement_type,
            photo,
            creator,
        }
    }

    /// Replace the creator id with the loaded creator document.
    pub fn populate(self, creator: User) -> AnnouncementDetail {
        AnnouncementDetail {
            id: self.id,
            title: self.title,
            description: self.description,
            announcement_type: self.announcement_type,
            photo: self.photo,
            creator,
        }
    }
}

/// An announcement with its creator resolved, as returned by the detail endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementDetail {
    #[serde(rename = "_id")]
    pub id: Ulid,
    pub title: String,
    pub description: String,
    pub announcement_type: String,
    pub photo: String,
    pub creator: User,
}

/// Partial update of an announcement's content. Absent fields keep their value.
/// The photo is handled separately because it must pass through the uploader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub announcement_type: Option<String>,
}

impl AnnouncementPatch {
    pub fn apply(self, announcement: &mut Announcement) {
        if let Some(title) = self.title {
            announcement.title = title;
        }
        if let Some(description) = self.description {
            announcement.description = description;
        }
        if let Some(announcement_type) = self.announcement_type {
            announcement.announcement_type = announcement_type;
        }
    }
}

/// A user with their announcement ids resolved into documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(rename = "_id")]
    pub id: Ulid,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub all_announcements: Vec<Announcement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> AnnouncementFields {
        AnnouncementFields {
            title: "Bike for sale".to_string(),
            description: "Barely used".to_string(),
            announcement_type: "sale".to_string(),
        }
    }

    #[test]
    fn user_link_and_unlink_behave_as_a_set() {
        let mut user = User::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            String::new(),
        );
        let id = Ulid::new();

        assert!(user.link(id));
        assert!(!user.link(id), "second link is a no-op");
        assert_eq!(user.all_announcements.len(), 1);
        assert!(user.owns(id));

        assert!(user.unlink(id));
        assert!(!user.unlink(id));
        assert!(!user.owns(id));
    }

    #[test]
    fn announcement_serializes_with_document_field_names() {
        let creator = Ulid::new();
        let announcement = Announcement::new(fields(), "https://img/1.png".to_string(), creator);
        let json = serde_json::to_value(&announcement).unwrap();

        assert_eq!(json["_id"], announcement.id.to_string());
        assert_eq!(json["announcementType"], "sale");
        assert_eq!(json["creator"], creator.to_string());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn populate_embeds_creator_document() {
        let user = User::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "https://img/ada.png".to_string(),
        );
        let announcement = Announcement::new(fields(), "https://img/1.png".to_string(), user.id);
        let detail = announcement.clone().populate(user.clone());

        assert_eq!(detail.id, announcement.id);
        assert_eq!(detail.creator, user);

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["creator"]["email"], "ada@example.com");
        assert!(json["creator"]["allAnnouncements"].is_array());
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let creator = Ulid::new();
        let mut announcement =
            Announcement::new(fields(), "https://img/1.png".to_string(), creator);
        let patch: AnnouncementPatch =
            serde_json::from_value(serde_json::json!({ "title": "Bike sold" })).unwrap();

        patch.apply(&mut announcement);

        assert_eq!(announcement.title, "Bike sold");
        assert_eq!(announcement.description, "Barely used");
        assert_eq!(announcement.announcement_type, "sale");
        assert_eq!(announcement.creator, creator);
    }

    #[test]
    fn new_user_avatar_defaults_to_empty() {
        let new_user: NewUser = serde_json::from_value(serde_json::json!({
            "name": "Ada",
            "email": "ada@example.com"
        }))
        .unwrap();
        assert_eq!(new_user.avatar, "");
    }
}
