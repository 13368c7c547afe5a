//! The resource registry: the allow-list of dashboard collections and their
//! query/form configuration. Arbitrary table names never reach SQL — if a
//! resource is not here, the API answers 404.
//!
//! Foreign-key expansion convention: a relation named `rel` joins table
//! `rel` through the local column `rel_id`.

use crate::query::{ListOptions, QueryParams, Sort, SortDirection};

use super::fields::{ColumnConfig, FieldConfig, SelectOption};

pub const CONTRACT_TYPES: &[SelectOption] = &[
    SelectOption {
        value: "contract",
        label: "Contract",
    },
    SelectOption {
        value: "full_time",
        label: "Full Time",
    },
    SelectOption {
        value: "sub_vendor",
        label: "Sub Vendor",
    },
];

pub const SENIORITY_LEVELS: &[SelectOption] = &[
    SelectOption {
        value: "fresher",
        label: "Fresher",
    },
    SelectOption {
        value: "junior",
        label: "Junior",
    },
    SelectOption {
        value: "mid_level",
        label: "Mid Level",
    },
    SelectOption {
        value: "senior",
        label: "Senior",
    },
    SelectOption {
        value: "cxo",
        label: "CXO",
    },
];

pub const EMPLOYMENT_TYPES: &[SelectOption] = &[
    SelectOption {
        value: "full_time",
        label: "Full-Time",
    },
    SelectOption {
        value: "part_time",
        label: "Part-Time",
    },
    SelectOption {
        value: "contract",
        label: "Contract",
    },
    SelectOption {
        value: "temporary",
        label: "Temporary",
    },
    SelectOption {
        value: "internship",
        label: "Internship",
    },
];

pub const WORKPLACE_TYPES: &[SelectOption] = &[
    SelectOption {
        value: "all",
        label: "All",
    },
    SelectOption {
        value: "on_site",
        label: "On-Site",
    },
    SelectOption {
        value: "hybrid",
        label: "Hybrid",
    },
    SelectOption {
        value: "remote",
        label: "Remote",
    },
];

pub const JOB_STATUSES: &[SelectOption] = &[
    SelectOption {
        value: "active",
        label: "Active",
    },
    SelectOption {
        value: "closed",
        label: "Closed",
    },
    SelectOption {
        value: "draft",
        label: "Draft",
    },
];

/// Static description of one dashboard collection.
#[derive(Debug, Clone, Copy)]
pub struct ResourceConfig {
    /// Route segment and table name.
    pub name: &'static str,
    pub search_columns: &'static [&'static str],
    pub default_sort: (&'static str, SortDirection),
    /// (relation, projected fields) pairs expanded inline on list fetches.
    pub foreign_keys: &'static [(&'static str, &'static [&'static str])],
}

pub const RESOURCES: &[ResourceConfig] = &[
    ResourceConfig {
        name: "clients",
        search_columns: &["name"],
        default_sort: ("created_at", SortDirection::Asc),
        foreign_keys: &[("company", &["id", "name"])],
    },
    ResourceConfig {
        name: "candidates",
        search_columns: &["name", "email", "role"],
        default_sort: ("created_at", SortDirection::Asc),
        foreign_keys: &[("company", &["id", "name"])],
    },
    ResourceConfig {
        name: "job_postings",
        search_columns: &["role"],
        default_sort: ("created_at", SortDirection::Desc),
        foreign_keys: &[("company", &["id", "name"])],
    },
];

pub fn lookup(name: &str) -> Option<&'static ResourceConfig> {
    RESOURCES.iter().find(|r| r.name == name)
}

impl ResourceConfig {
    pub fn list_options(&self) -> ListOptions {
        let mut options = ListOptions::new(self.name);
        options.sort = Sort::new(self.default_sort.0, self.default_sort.1);
        options.search_columns = self.search_columns.iter().map(|c| c.to_string()).collect();
        options.foreign_keys = self
            .foreign_keys
            .iter()
            .map(|(rel, fields)| {
                (
                    rel.to_string(),
                    fields.iter().map(|f| f.to_string()).collect(),
                )
            })
            .collect();
        options
    }

    pub fn base_params(&self) -> QueryParams {
        let options = self.list_options();
        let mut params = QueryParams::new(&options.resource);
        params.sort = options.sort;
        params.search_columns = options.search_columns;
        params.foreign_keys = options.foreign_keys;
        params
    }

    pub fn form_fields(&self) -> Vec<FieldConfig> {
        match self.name {
            "clients" => vec![
                FieldConfig::Text {
                    name: "name",
                    label: "Client Name",
                    required: true,
                    placeholder: Some("client name"),
                },
                FieldConfig::Date {
                    name: "start_date",
                    label: "Start Date",
                    required: true,
                },
                FieldConfig::Select {
                    name: "contract_type",
                    label: "Contract Type",
                    required: true,
                    options: CONTRACT_TYPES,
                },
            ],
            "candidates" => vec![
                FieldConfig::Text {
                    name: "name",
                    label: "Candidate Name",
                    required: true,
                    placeholder: Some("full name"),
                },
                FieldConfig::Text {
                    name: "email",
                    label: "Email",
                    required: true,
                    placeholder: Some("name@example.com"),
                },
                FieldConfig::Text {
                    name: "role",
                    label: "Current Role",
                    required: false,
                    placeholder: None,
                },
                FieldConfig::Upload {
                    name: "resume_url",
                    label: "Resume",
                    accept: ".pdf,.doc,.docx",
                },
            ],
            "job_postings" => vec![
                FieldConfig::Text {
                    name: "role",
                    label: "Job Role",
                    required: true,
                    placeholder: None,
                },
                FieldConfig::Number {
                    name: "experience",
                    label: "Experience",
                    required: true,
                },
                FieldConfig::Select {
                    name: "seniority_level",
                    label: "Level",
                    required: true,
                    options: SENIORITY_LEVELS,
                },
                FieldConfig::Select {
                    name: "employment_type",
                    label: "Employment",
                    required: true,
                    options: EMPLOYMENT_TYPES,
                },
                FieldConfig::Select {
                    name: "workplace_type",
                    label: "Workplace",
                    required: true,
                    options: WORKPLACE_TYPES,
                },
                FieldConfig::NestedGroup {
                    name: "salary",
                    label: "Salary",
                    fields: vec![
                        FieldConfig::Number {
                            name: "from_salary",
                            label: "Salary From",
                            required: true,
                        },
                        FieldConfig::Number {
                            name: "to_salary",
                            label: "Salary To",
                            required: true,
                        },
                    ],
                },
                FieldConfig::TextArea {
                    name: "job_description_ai",
                    label: "AI Job Description",
                    required: false,
                },
                FieldConfig::CustomComponent {
                    name: "skills_required",
                    label: "Select Skills",
                    component: "input-selection",
                },
            ],
            _ => Vec::new(),
        }
    }

    pub fn filter_fields(&self) -> Vec<FieldConfig> {
        match self.name {
            "clients" => vec![FieldConfig::Text {
                name: "name",
                label: "Name",
                required: false,
                placeholder: None,
            }],
            "candidates" => vec![FieldConfig::Text {
                name: "name",
                label: "Name",
                required: false,
                placeholder: None,
            }],
            "job_postings" => vec![
                FieldConfig::Text {
                    name: "role",
                    label: "Job Role",
                    required: false,
                    placeholder: None,
                },
                FieldConfig::Select {
                    name: "job_status",
                    label: "Status",
                    required: false,
                    options: JOB_STATUSES,
                },
            ],
            _ => Vec::new(),
        }
    }

    pub fn columns(&self) -> Vec<ColumnConfig> {
        match self.name {
            "clients" => vec![
                ColumnConfig {
                    label: "Name",
                    name: "name",
                    width: 200,
                    filterable: true,
                },
                ColumnConfig {
                    label: "Contract Type",
                    name: "contract_type",
                    width: 200,
                    filterable: true,
                },
                ColumnConfig {
                    label: "Joining Date",
                    name: "start_date",
                    width: 200,
                    filterable: true,
                },
            ],
            "candidates" => vec![
                ColumnConfig {
                    label: "Name",
                    name: "name",
                    width: 200,
                    filterable: true,
                },
                ColumnConfig {
                    label: "Email",
                    name: "email",
                    width: 240,
                    filterable: true,
                },
                ColumnConfig {
                    label: "Role",
                    name: "role",
                    width: 200,
                    filterable: true,
                },
            ],
            "job_postings" => vec![
                ColumnConfig {
                    label: "Job Post",
                    name: "role",
                    width: 200,
                    filterable: true,
                },
                ColumnConfig {
                    label: "Status",
                    name: "job_status",
                    width: 120,
                    filterable: true,
                },
                ColumnConfig {
                    label: "Responses",
                    name: "interview_count",
                    width: 120,
                    filterable: false,
                },
            ],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_and_unknown_resources() {
        assert!(lookup("clients").is_some());
        assert!(lookup("candidates").is_some());
        assert!(lookup("job_postings").is_some());
        assert!(lookup("pg_catalog").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn test_base_params_carry_resource_configuration() {
        let params = lookup("job_postings").unwrap().base_params();
        assert_eq!(params.resource, "job_postings");
        assert_eq!(params.sort, Sort::new("created_at", SortDirection::Desc));
        assert_eq!(params.search_columns, vec!["role"]);
        assert_eq!(
            params.foreign_keys.get("company"),
            Some(&vec!["id".to_string(), "name".to_string()])
        );
    }

    #[test]
    fn test_every_resource_compiles_cleanly() {
        for resource in RESOURCES {
            let compiled = crate::query::compile(&resource.base_params()).unwrap();
            assert!(compiled.diagnostics.is_empty(), "{}", resource.name);
        }
    }

    #[test]
    fn test_every_resource_has_form_and_columns() {
        for resource in RESOURCES {
            assert!(!resource.form_fields().is_empty(), "{}", resource.name);
            assert!(!resource.columns().is_empty(), "{}", resource.name);
        }
    }
}
