//! Infrastructure node kinds and their categories

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Coarse grouping of node kinds. Rules and the what-if tables match on
/// categories when the exact kind does not matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeCategory {
    External,
    Endpoint,
    Security,
    Auth,
    Network,
    Compute,
    Storage,
    Monitoring,
    Cloud,
    Telecom,
    Wan,
    Unknown,
}

impl NodeCategory {
    pub fn name(&self) -> &'static str {
        match self {
            NodeCategory::External => "external",
            NodeCategory::Endpoint => "endpoint",
            NodeCategory::Security => "security",
            NodeCategory::Auth => "auth",
            NodeCategory::Network => "network",
            NodeCategory::Compute => "compute",
            NodeCategory::Storage => "storage",
            NodeCategory::Monitoring => "monitoring",
            NodeCategory::Cloud => "cloud",
            NodeCategory::Telecom => "telecom",
            NodeCategory::Wan => "wan",
            NodeCategory::Unknown => "unknown",
        }
    }
}

macro_rules! node_types {
    ($( $variant:ident => $name:literal, $category:ident; )*) => {
        /// Kind of infrastructure node.
        ///
        /// Producers may emit kinds this crate does not know; those
        /// deserialize to `Unknown` carrying the raw wire name, so a spec
        /// round-trips unchanged and the differ still sees a type change.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum NodeType {
            $( $variant, )*
            Unknown(String),
        }

        impl NodeType {
            const ALL: &'static [NodeType] = &[ $( NodeType::$variant, )* ];

            /// Wire name (`"web-server"`, `"ids-ips"`, ...)
            pub fn as_str(&self) -> &str {
                match self {
                    $( NodeType::$variant => $name, )*
                    NodeType::Unknown(raw) => raw.as_str(),
                }
            }

            /// Known kind for an exact wire name, `Unknown` otherwise
            pub fn from_wire(name: &str) -> Self {
                match name {
                    $( $name => NodeType::$variant, )*
                    other => NodeType::Unknown(other.to_string()),
                }
            }

            pub fn category(&self) -> NodeCategory {
                match self {
                    $( NodeType::$variant => NodeCategory::$category, )*
                    NodeType::Unknown(_) => NodeCategory::Unknown,
                }
            }

            /// Every known kind, in declaration order
            pub fn all() -> &'static [NodeType] {
                Self::ALL
            }
        }

        impl std::str::FromStr for NodeType {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $( $name => Ok(NodeType::$variant), )*
                    other => Err(format!("Unknown node type '{}'", other)),
                }
            }
        }
    };
}

node_types! {
    // External
    Internet => "internet", External;
    User => "user", External;
    ExternalApi => "external-api", External;
    // Endpoints
    Workstation => "workstation", Endpoint;
    MobileDevice => "mobile-device", Endpoint;
    IotDevice => "iot-device", Endpoint;
    // Security appliances
    Firewall => "firewall", Security;
    Waf => "waf", Security;
    IdsIps => "ids-ips", Security;
    VpnGateway => "vpn-gateway", Security;
    Nac => "nac", Security;
    Dlp => "dlp", Security;
    DdosProtection => "ddos-protection", Security;
    Siem => "siem", Security;
    Soar => "soar", Security;
    Kms => "kms", Security;
    // Identity
    Sso => "sso", Auth;
    Mfa => "mfa", Auth;
    Iam => "iam", Auth;
    LdapAd => "ldap-ad", Auth;
    Pam => "pam", Auth;
    // Network
    Router => "router", Network;
    SwitchL2 => "switch-l2", Network;
    SwitchL3 => "switch-l3", Network;
    LoadBalancer => "load-balancer", Network;
    Dns => "dns", Network;
    Cdn => "cdn", Network;
    ApiGateway => "api-gateway", Network;
    Proxy => "proxy", Network;
    NatGateway => "nat-gateway", Network;
    // Compute
    WebServer => "web-server", Compute;
    AppServer => "app-server", Compute;
    Container => "container", Compute;
    Kubernetes => "kubernetes", Compute;
    Vm => "vm", Compute;
    Serverless => "serverless", Compute;
    BastionHost => "bastion-host", Compute;
    // Storage
    DbServer => "db-server", Storage;
    Nosql => "nosql", Storage;
    Cache => "cache", Storage;
    ObjectStorage => "object-storage", Storage;
    FileStorage => "file-storage", Storage;
    Backup => "backup", Storage;
    DataWarehouse => "data-warehouse", Storage;
    MessageQueue => "message-queue", Storage;
    SanNas => "san-nas", Storage;
    // Monitoring
    Logging => "logging", Monitoring;
    Monitoring => "monitoring", Monitoring;
    Apm => "apm", Monitoring;
    // Cloud
    AwsVpc => "aws-vpc", Cloud;
    AzureVnet => "azure-vnet", Cloud;
    GcpNetwork => "gcp-network", Cloud;
    PrivateCloud => "private-cloud", Cloud;
    // Telecom
    CentralOffice => "central-office", Telecom;
    BaseStation => "base-station", Telecom;
    Olt => "olt", Telecom;
    Ont => "ont", Telecom;
    MobileCore => "mobile-core", Telecom;
    // WAN
    Mpls => "mpls", Wan;
    SdWan => "sd-wan", Wan;
    DedicatedLine => "dedicated-line", Wan;
}

/// Perimeter protection appliances. Adding one is worth +15 in what-if
/// analysis, removing one costs 25.
pub const PROTECTION_TYPES: &[NodeType] = &[
    NodeType::Waf,
    NodeType::Firewall,
    NodeType::IdsIps,
    NodeType::Nac,
    NodeType::Dlp,
];

/// Kinds that hold persistent data worth protecting
pub const DATA_STORE_TYPES: &[NodeType] = &[
    NodeType::DbServer,
    NodeType::Nosql,
    NodeType::Cache,
    NodeType::ObjectStorage,
    NodeType::FileStorage,
    NodeType::DataWarehouse,
    NodeType::SanNas,
];

/// Kinds that serve traffic coming from outside
pub const PUBLIC_SERVICE_TYPES: &[NodeType] = &[
    NodeType::WebServer,
    NodeType::ApiGateway,
    NodeType::AppServer,
    NodeType::Serverless,
    NodeType::Container,
    NodeType::Kubernetes,
];

/// Hops that inspect or filter traffic on the way in
pub const INSPECTION_TYPES: &[NodeType] = &[
    NodeType::Firewall,
    NodeType::Waf,
    NodeType::IdsIps,
    NodeType::Proxy,
    NodeType::ApiGateway,
];

impl NodeType {
    pub fn is_data_store(&self) -> bool {
        DATA_STORE_TYPES.contains(self)
    }

    pub fn is_protection(&self) -> bool {
        PROTECTION_TYPES.contains(self)
    }
}

impl Serialize for NodeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(NodeType::from_wire(&name))
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
