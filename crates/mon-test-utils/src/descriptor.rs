//! Sample service descriptors.

/// A descriptor exercising every dependency and log format the engines know,
/// with a two-host `EXP` environment and a one-host `DEV` environment.
pub const SAMPLE_DESCRIPTOR_JSON: &str = r#"{
  "identification": {
    "service_name": "Payments API",
    "service_desc": "Card payment processing",
    "priority": "Alta"
  },
  "tech_stack": [
    { "technology": "Django", "version": "5.2.3" },
    { "technology": "PostgreSQL", "version": "17" }
  ],
  "responsables": [
    { "nombre": "Ana Pérez", "email": "ana@example.com" },
    { "nombre": "Luis Gómez", "email": "luis@example.com" }
  ],
  "dependencies": [
    {
      "name": "DB",
      "type": "Base de datos",
      "nature": "Interna",
      "impact": "Crítico",
      "port": "5432",
      "check_protocol": "tcp",
      "effect": "Payments cannot be stored"
    },
    {
      "name": "Auth API",
      "type": "API",
      "nature": "Externa",
      "impact": "Alto",
      "port": 443,
      "check_protocol": "http",
      "effect": "Users cannot log in",
      "check_params": { "url": "/api/v1/health", "expected_status": 200 }
    },
    {
      "name": "Worker",
      "type": "Contenedor",
      "nature": "Interna",
      "impact": "Medio",
      "port": "",
      "check_protocol": "docker",
      "effect": "Refunds are delayed",
      "check_params": { "container_name": "payments-worker" }
    }
  ],
  "logs": [
    {
      "name": "payments.log",
      "path": "/var/log/payments/payments.log",
      "format": "Texto plano simple",
      "retention_method": "tamano",
      "retention_value": "10MB, 5 backups",
      "patterns": ["[TIMESTAMP] LEVEL [MODULE:LINE] FUNCTION - MESSAGE"]
    },
    {
      "name": "worker.log",
      "path": "/var/log/payments/worker.log",
      "format": "Texto plano multilínea",
      "retention_method": "tiempo",
      "retention_value": "30 days",
      "patterns": ["TIMESTAMP LEVEL [THREAD] MESSAGE"]
    },
    {
      "name": "audit.log",
      "path": "/var/log/payments/audit.json",
      "format": "JSON estructurado",
      "retention_method": "tamano",
      "retention_value": "50MB, 10 backups",
      "patterns": []
    },
    {
      "name": "security.log",
      "path": "/var/log/payments/security.log",
      "format": "Texto plano simple",
      "retention_method": "tamano",
      "retention_value": "10MB, 10 backups",
      "patterns": ["[SECURITY] TIMESTAMP LEVEL - User:USERNAME IP:IP_ADDRESS Action:ACTION MESSAGE"]
    }
  ],
  "health_api": true,
  "health_api_details": {
    "endpoint": "https://payments.example.com/api/health",
    "format": "JSON",
    "interval_sec": 30
  },
  "envs": [
    {
      "name": "EXP",
      "desc": "Producción",
      "location": "dc-1",
      "hosts": [
        { "type": "host", "identifier": "web-01" },
        { "type": "host", "identifier": "web-02" }
      ]
    },
    {
      "name": "DEV",
      "desc": "Desarrollo",
      "location": "lab",
      "hosts": [
        { "type": "container", "identifier": "payments-dev" }
      ]
    }
  ],
  "notes": "Fixture"
}
"#;

/// The smallest valid descriptor: one tcp dependency, one host.
pub const MINIMAL_DESCRIPTOR_JSON: &str = r#"{
  "identification": { "service_name": "Inventory", "priority": "Baja" },
  "responsables": [{ "nombre": "Ops", "email": "ops@example.com" }],
  "dependencies": [
    { "name": "DB", "type": "db", "nature": "Interna", "impact": "Bajo",
      "port": "5432", "check_protocol": "tcp", "effect": "" }
  ],
  "logs": [],
  "envs": [
    { "name": "EXP", "desc": "", "location": "", "hosts": [{ "type": "host", "identifier": "inv-01" }] }
  ]
}
"#;
